//! Responses for the six request kinds the access layer issues.

use std::collections::HashMap;

use crate::types::{Item, Key, WriteRequest};

/// `GetItem` response.
#[derive(Debug, Clone, Default)]
pub struct GetItemOutput {
    /// The retrieved item, `None` when no item has the requested key.
    pub item: Option<Item>,
}

/// `PutItem` response.
#[derive(Debug, Clone, Default)]
pub struct PutItemOutput {
    /// The item as it appeared before the put (only with `ALL_OLD`).
    pub attributes: Item,
}

/// `DeleteItem` response.
#[derive(Debug, Clone, Default)]
pub struct DeleteItemOutput {
    /// The item as it appeared before the deletion (only with `ALL_OLD`).
    pub attributes: Item,
}

/// `UpdateItem` response.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemOutput {
    /// Attributes before or after the update, depending on `ReturnValues`.
    pub attributes: Item,
}

/// `Query` response.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    /// Items that matched the key condition and passed the filter.
    pub items: Vec<Item>,

    /// Items returned on this page, after the filter.
    pub count: i32,

    /// The number of items evaluated before the filter was applied.
    pub scanned_count: i32,

    /// Where the query stopped; empty when the range is exhausted.
    pub last_evaluated_key: Key,
}

/// `BatchWriteItem` response.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteItemOutput {
    /// Writes the store did not apply; resend them in a subsequent request.
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,
}

impl BatchWriteItemOutput {
    /// Whether every write was applied.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unprocessed_items.values().all(Vec::is_empty)
    }
}
