//! Request inputs for the six request kinds the access layer issues.
//!
//! Optional fields stay `None` when unset; empty maps mean "not sent".

use std::collections::HashMap;

use crate::types::{
    ExpressionAttributeNames, ExpressionAttributeValues, Item, Key, ReturnValue, WriteRequest,
};

// Single-item requests

/// `GetItem` request.
#[derive(Debug, Clone, Default)]
pub struct GetItemInput {
    /// The name of the table containing the item.
    pub table_name: String,

    /// The primary key of the item to retrieve.
    pub key: Key,

    /// Read the latest committed write instead of an eventually consistent copy.
    pub consistent_read: Option<bool>,
}

/// `PutItem` request.
#[derive(Debug, Clone, Default)]
pub struct PutItemInput {
    /// The name of the table to put the item into.
    pub table_name: String,

    /// The full item, key attributes included.
    pub item: Item,

    /// A condition that must be satisfied for the put to succeed.
    pub condition_expression: Option<String>,

    /// `#name` bindings referenced by the expressions.
    pub expression_attribute_names: ExpressionAttributeNames,

    /// `:value` bindings referenced by the expressions.
    pub expression_attribute_values: ExpressionAttributeValues,

    /// Which item image the store should send back.
    pub return_values: Option<ReturnValue>,
}

/// `DeleteItem` request.
#[derive(Debug, Clone, Default)]
pub struct DeleteItemInput {
    /// The name of the table from which to delete the item.
    pub table_name: String,

    /// The primary key of the item to delete.
    pub key: Key,

    /// A condition that must be satisfied for the deletion to succeed.
    pub condition_expression: Option<String>,

    /// `#name` bindings referenced by the expressions.
    pub expression_attribute_names: ExpressionAttributeNames,

    /// `:value` bindings referenced by the expressions.
    pub expression_attribute_values: ExpressionAttributeValues,

    /// Which item image the store should send back.
    pub return_values: Option<ReturnValue>,
}

/// `UpdateItem` request.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    /// The name of the table containing the item to update.
    pub table_name: String,

    /// The primary key of the item to be updated.
    pub key: Key,

    /// An expression that defines one or more attributes to be updated.
    pub update_expression: Option<String>,

    /// A condition that must be satisfied for the update to succeed.
    pub condition_expression: Option<String>,

    /// `#name` bindings referenced by the expressions.
    pub expression_attribute_names: ExpressionAttributeNames,

    /// `:value` bindings referenced by the expressions.
    pub expression_attribute_values: ExpressionAttributeValues,

    /// Which item image the store should send back.
    pub return_values: Option<ReturnValue>,
}

// Range query

/// `Query` request.
#[derive(Debug, Clone, Default)]
pub struct QueryInput {
    /// The name of the table to query.
    pub table_name: String,

    /// The name of a secondary index to query.
    pub index_name: Option<String>,

    /// The condition that specifies the key values for items to be retrieved.
    pub key_condition_expression: Option<String>,

    /// Conditions applied after key matching; does not affect pagination.
    pub filter_expression: Option<String>,

    /// `#name` bindings referenced by the expressions.
    pub expression_attribute_names: ExpressionAttributeNames,

    /// `:value` bindings referenced by the expressions.
    pub expression_attribute_values: ExpressionAttributeValues,

    /// `true` (default) for ascending sort order, `false` for descending.
    pub scan_index_forward: Option<bool>,

    /// The maximum number of items to evaluate (before filtering).
    pub limit: Option<i32>,

    /// The key of the item after which evaluation starts.
    pub exclusive_start_key: Key,

    /// Read the latest committed write instead of an eventually consistent copy.
    pub consistent_read: Option<bool>,
}

// Bulk writes

/// `BatchWriteItem` request.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteItemInput {
    /// Table name to the list of put or delete requests for that table.
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}

impl BatchWriteItemInput {
    /// Build a bulk write against a single table.
    #[must_use]
    pub fn for_table(table_name: impl Into<String>, requests: Vec<WriteRequest>) -> Self {
        let mut request_items = HashMap::with_capacity(1);
        request_items.insert(table_name.into(), requests);
        Self { request_items }
    }

    /// Total number of write requests across all tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.request_items.values().map(Vec::len).sum()
    }

    /// Whether the request carries no writes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
