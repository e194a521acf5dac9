//! In-memory request executor.
//!
//! [`MemoryExecutor`] keeps each table in a `BTreeMap` ordered by primary key
//! behind a `parking_lot::RwLock`; tables live in a [`DashMap`]. Conditions are
//! checked and writes applied under one write lock, so conditional writes are
//! atomic per table. Queries scan the table, evaluate the key condition and
//! order results by the queried key.
//!
//! ```text
//! DashMap<TableName, Arc<MemoryTable>>
//!   MemoryTable: RwLock<BTreeMap<(SortKey, SortKey), Item>>
//! ```

pub mod eval;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tablekit_model::input::{
    BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput, QueryInput, UpdateItemInput,
};
use tablekit_model::output::{
    BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput, QueryOutput,
    UpdateItemOutput,
};
use tablekit_model::types::{ExpressionAttributeNames, ExpressionAttributeValues, ReturnValue};
use tablekit_model::{AttributeValue, Item, Key, StoreError};
use tracing::debug;

use self::eval::{Scope, apply_update, evaluate_condition, scalar_order};
use crate::config::{MAX_BATCH_SIZE, TableConfig};
use crate::executor::RequestExecutor;
use crate::schema::{IndexDefinition, TableSchema};

/// A scalar key value with the store's ordering: strings and binaries by
/// bytes, numbers numerically.
#[derive(Debug, Clone)]
pub enum SortKey {
    /// String key.
    S(String),
    /// Number key, kept in its original representation.
    N(String),
    /// Binary key.
    B(bytes::Bytes),
}

impl SortKey {
    /// Convert a key attribute value; only `S`, `N` and `B` are valid keys.
    pub fn from_attribute(name: &str, value: &AttributeValue) -> Result<Self, StoreError> {
        match value {
            AttributeValue::S(s) => Ok(Self::S(s.clone())),
            AttributeValue::N(n) => Ok(Self::N(n.clone())),
            AttributeValue::B(b) => Ok(Self::B(b.clone())),
            other => Err(StoreError::validation(format!(
                "key attribute {name} must be S, N or B, got {}",
                other.type_descriptor()
            ))),
        }
    }

    fn as_attribute(&self) -> AttributeValue {
        match self {
            Self::S(s) => AttributeValue::S(s.clone()),
            Self::N(n) => AttributeValue::N(n.clone()),
            Self::B(b) => AttributeValue::B(b.clone()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::S(_) => 0,
            Self::N(_) => 1,
            Self::B(_) => 2,
        }
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Self::N(a), Self::N(b)) = (self, other) {
            let a = a.parse::<f64>().unwrap_or(f64::NAN);
            let b = b.parse::<f64>().unwrap_or(f64::NAN);
            return a.total_cmp(&b);
        }
        scalar_order(&self.as_attribute(), &other.as_attribute())
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

type PrimaryKey = (SortKey, SortKey);

/// One table's items and key declarations.
#[derive(Debug)]
pub struct MemoryTable {
    schema: TableSchema,
    indexes: Vec<IndexDefinition>,
    items: RwLock<BTreeMap<PrimaryKey, Item>>,
}

impl MemoryTable {
    fn new(schema: TableSchema, indexes: Vec<IndexDefinition>) -> Self {
        Self {
            schema,
            indexes,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    fn primary_key(&self, attrs: &Item) -> Result<PrimaryKey, StoreError> {
        let get = |name: &str| {
            let value = attrs.get(name).ok_or_else(|| {
                StoreError::validation(format!("missing key attribute {name}"))
            })?;
            SortKey::from_attribute(name, value)
        };
        Ok((get(&self.schema.partition)?, get(&self.schema.sort)?))
    }

    fn key_attributes(&self, key: &Key) -> Result<PrimaryKey, StoreError> {
        if key.len() != 2 {
            return Err(StoreError::validation(
                "the provided key does not match the table's key schema",
            ));
        }
        self.primary_key(key)
    }
}

fn check_condition(
    expression: Option<&str>,
    current: Option<&Item>,
    names: &ExpressionAttributeNames,
    values: &ExpressionAttributeValues,
) -> Result<(), StoreError> {
    let Some(expression) = expression else {
        return Ok(());
    };
    let empty = Item::new();
    let scope = Scope {
        item: current.unwrap_or(&empty),
        names,
        values,
    };
    if evaluate_condition(expression, scope)? {
        Ok(())
    } else {
        Err(StoreError::conditional_check_failed(
            "The conditional request failed",
        ))
    }
}

fn returned(
    return_values: Option<ReturnValue>,
    old: Option<Item>,
    new: Option<&Item>,
) -> Item {
    match return_values.unwrap_or_default() {
        ReturnValue::None => Item::new(),
        ReturnValue::AllOld | ReturnValue::UpdatedOld => old.unwrap_or_default(),
        ReturnValue::AllNew | ReturnValue::UpdatedNew => new.cloned().unwrap_or_default(),
    }
}

/// Request executor over in-process tables.
///
/// # Examples
///
/// ```
/// use tablekit_core::{MemoryExecutor, TableSchema};
///
/// let executor = MemoryExecutor::new().with_table("users", TableSchema::new("pk", "sk"), vec![]);
/// assert_eq!(executor.item_count("users"), 0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: DashMap<String, Arc<MemoryTable>>,
}

impl MemoryExecutor {
    /// An executor with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor with the table `config` describes.
    #[must_use]
    pub fn for_config(config: &TableConfig) -> Self {
        Self::new().with_table(
            config.table_name.clone(),
            config.schema.clone(),
            config.indexes.clone(),
        )
    }

    /// Add a table, replacing any table of the same name.
    #[must_use]
    pub fn with_table(
        self,
        name: impl Into<String>,
        schema: TableSchema,
        indexes: Vec<IndexDefinition>,
    ) -> Self {
        self.create_table(name, schema, indexes);
        self
    }

    /// Create or replace a table.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        schema: TableSchema,
        indexes: Vec<IndexDefinition>,
    ) {
        let name = name.into();
        debug!(table = %name, indexes = indexes.len(), "creating in-memory table");
        self.tables
            .insert(name, Arc::new(MemoryTable::new(schema, indexes)));
    }

    /// Snapshot of a table's items in primary key order.
    #[must_use]
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.tables
            .get(table)
            .map(|t| t.items.read().values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of items stored in a table; zero for unknown tables.
    #[must_use]
    pub fn item_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.items.read().len())
    }

    fn table(&self, name: &str) -> Result<Arc<MemoryTable>, StoreError> {
        self.tables
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| StoreError::resource_not_found(format!("table {name} not found")))
    }
}

/// Position of an item in a query's iteration order.
type QueryPosition = [Option<SortKey>; 4];

fn position(item: &Item, attrs: [&str; 4]) -> QueryPosition {
    attrs.map(|name| {
        item.get(name)
            .and_then(|v| SortKey::from_attribute(name, v).ok())
    })
}

#[async_trait::async_trait]
impl RequestExecutor for MemoryExecutor {
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, StoreError> {
        let table = self.table(&input.table_name)?;
        let key = table.key_attributes(&input.key)?;
        let item = table.items.read().get(&key).cloned();
        Ok(GetItemOutput { item })
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, StoreError> {
        let table = self.table(&input.table_name)?;
        let key = table.primary_key(&input.item)?;

        let mut items = table.items.write();
        check_condition(
            input.condition_expression.as_deref(),
            items.get(&key),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;
        let old = items.insert(key, input.item);
        Ok(PutItemOutput {
            attributes: returned(input.return_values, old, None),
        })
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, StoreError> {
        let table = self.table(&input.table_name)?;
        let key = table.key_attributes(&input.key)?;

        let mut items = table.items.write();
        check_condition(
            input.condition_expression.as_deref(),
            items.get(&key),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;
        let old = items.remove(&key);
        Ok(DeleteItemOutput {
            attributes: returned(input.return_values, old, None),
        })
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, StoreError> {
        let table = self.table(&input.table_name)?;
        let key = table.key_attributes(&input.key)?;

        let mut items = table.items.write();
        let old = items.get(&key).cloned();
        check_condition(
            input.condition_expression.as_deref(),
            old.as_ref(),
            &input.expression_attribute_names,
            &input.expression_attribute_values,
        )?;

        let mut updated = old.clone().unwrap_or_else(|| input.key.clone());
        if let Some(expression) = input.update_expression.as_deref() {
            apply_update(
                expression,
                &mut updated,
                &input.expression_attribute_names,
                &input.expression_attribute_values,
            )?;
        }
        if table.primary_key(&updated)? != key {
            return Err(StoreError::validation(
                "cannot update attribute that is part of the key",
            ));
        }

        let attributes = returned(input.return_values, old, Some(&updated));
        items.insert(key, updated);
        Ok(UpdateItemOutput { attributes })
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        let table = self.table(&input.table_name)?;
        let (partition, sort) = match input.index_name.as_deref() {
            Some(name) => {
                let index = table
                    .indexes
                    .iter()
                    .find(|index| index.name == name)
                    .ok_or_else(|| {
                        StoreError::validation(format!(
                            "the table does not have the specified index: {name}"
                        ))
                    })?;
                (index.partition.as_str(), index.sort.as_str())
            }
            None => (table.schema.partition.as_str(), table.schema.sort.as_str()),
        };
        let order = [
            partition,
            sort,
            table.schema.partition.as_str(),
            table.schema.sort.as_str(),
        ];
        let key_condition = input.key_condition_expression.as_deref().unwrap_or_default();
        let names = &input.expression_attribute_names;
        let values = &input.expression_attribute_values;

        let mut matched = Vec::new();
        for item in table.items.read().values() {
            if !item.contains_key(partition) || !item.contains_key(sort) {
                continue;
            }
            if evaluate_condition(key_condition, Scope { item, names, values })? {
                matched.push((position(item, order), item.clone()));
            }
        }
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        if input.scan_index_forward == Some(false) {
            matched.reverse();
        }

        let mut remaining = matched.into_iter().peekable();
        if !input.exclusive_start_key.is_empty() {
            let start = position(&input.exclusive_start_key, order);
            let forward = input.scan_index_forward != Some(false);
            while remaining.peek().is_some_and(|(pos, _)| {
                let ord = pos.cmp(&start);
                if forward { ord != Ordering::Greater } else { ord != Ordering::Less }
            }) {
                remaining.next();
            }
        }

        let limit = input
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        let evaluated: Vec<Item> = remaining.by_ref().take(limit).map(|(_, item)| item).collect();
        let has_more = remaining.peek().is_some();

        let last_evaluated_key = match evaluated.last() {
            Some(last) if has_more => order
                .iter()
                .filter_map(|name| last.get(*name).map(|v| ((*name).to_owned(), v.clone())))
                .collect(),
            _ => Key::new(),
        };

        let filter = input.filter_expression.as_deref().unwrap_or_default();
        let mut items = Vec::with_capacity(evaluated.len());
        for item in &evaluated {
            if evaluate_condition(filter, Scope { item, names, values })? {
                items.push(item.clone());
            }
        }

        let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
        let scanned_count = i32::try_from(evaluated.len()).unwrap_or(i32::MAX);
        Ok(QueryOutput {
            items,
            count,
            scanned_count,
            last_evaluated_key,
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError> {
        if input.len() > MAX_BATCH_SIZE {
            return Err(StoreError::validation(format!(
                "too many items requested for the BatchWriteItem call: {} > {MAX_BATCH_SIZE}",
                input.len()
            )));
        }

        for (name, requests) in input.request_items {
            let table = self.table(&name)?;
            let mut items = table.items.write();
            for request in requests {
                if let Some(put) = request.put_request {
                    let key = table.primary_key(&put.item)?;
                    items.insert(key, put.item);
                } else if let Some(delete) = request.delete_request {
                    let key = table.key_attributes(&delete.key)?;
                    items.remove(&key);
                }
            }
        }
        Ok(BatchWriteItemOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tablekit_model::types::WriteRequest;

    use super::*;

    fn executor() -> MemoryExecutor {
        MemoryExecutor::new().with_table(
            "t",
            TableSchema::new("pk", "sk"),
            vec![IndexDefinition::new("byScore", "pk", "score")],
        )
    }

    fn item(pk: &str, sk: &str, score: i64) -> Item {
        Item::from([
            ("pk".to_owned(), AttributeValue::from(pk)),
            ("sk".to_owned(), AttributeValue::from(sk)),
            ("score".to_owned(), AttributeValue::number(score)),
        ])
    }

    fn key_query(limit: Option<i32>) -> QueryInput {
        QueryInput {
            table_name: "t".to_owned(),
            key_condition_expression: Some("#pk = :pk".to_owned()),
            expression_attribute_names: HashMap::from([("#pk".to_owned(), "pk".to_owned())]),
            expression_attribute_values: HashMap::from([(
                ":pk".to_owned(),
                AttributeValue::from("p"),
            )]),
            limit,
            ..Default::default()
        }
    }

    async fn seed(executor: &MemoryExecutor) {
        let requests = [("a", 30), ("b", 10), ("c", 20)]
            .into_iter()
            .map(|(sk, score)| WriteRequest::put(item("p", sk, score)))
            .collect();
        executor
            .batch_write_item(BatchWriteItemInput::for_table("t", requests))
            .await
            .unwrap();
    }

    #[test]
    fn test_should_order_sort_keys_like_the_store() {
        assert!(SortKey::N("9".into()) < SortKey::N("10".into()));
        assert!(SortKey::S("10".into()) < SortKey::S("9".into()));
        assert_eq!(SortKey::N("1.0".into()), SortKey::N("1".into()));
    }

    #[tokio::test]
    async fn test_should_fail_conditional_put_on_existing_item() {
        let executor = executor();
        let put = |condition: Option<&str>| PutItemInput {
            table_name: "t".to_owned(),
            item: item("p", "a", 1),
            condition_expression: condition.map(str::to_owned),
            expression_attribute_names: HashMap::from([("#pk".to_owned(), "pk".to_owned())]),
            ..Default::default()
        };
        executor.put_item(put(Some("attribute_not_exists(#pk)"))).await.unwrap();
        let err = executor
            .put_item(put(Some("attribute_not_exists(#pk)")))
            .await
            .unwrap_err();
        assert!(err.is_conditional_check_failed());
        assert_eq!(executor.item_count("t"), 1);
    }

    #[tokio::test]
    async fn test_should_page_with_cursor() {
        let executor = executor();
        seed(&executor).await;

        let first = executor.query(key_query(Some(2))).await.unwrap();
        assert_eq!(first.count, 2);
        assert_eq!(first.last_evaluated_key.get("sk"), Some(&AttributeValue::from("b")));

        let second = executor
            .query(QueryInput {
                exclusive_start_key: first.last_evaluated_key,
                ..key_query(Some(2))
            })
            .await
            .unwrap();
        assert_eq!(second.count, 1);
        assert!(second.last_evaluated_key.is_empty());

        let exact = executor.query(key_query(Some(3))).await.unwrap();
        assert!(exact.last_evaluated_key.is_empty());
    }

    #[tokio::test]
    async fn test_should_order_index_query_by_index_sort_key() {
        let executor = executor();
        seed(&executor).await;

        let output = executor
            .query(QueryInput {
                index_name: Some("byScore".to_owned()),
                scan_index_forward: Some(false),
                ..key_query(None)
            })
            .await
            .unwrap();
        let sks: Vec<_> = output.items.iter().filter_map(|i| i.get("sk")?.as_s()).collect();
        assert_eq!(sks, ["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_should_apply_limit_before_filter() {
        let executor = executor();
        seed(&executor).await;

        let mut input = key_query(Some(2));
        input.filter_expression = Some("#score > :min".to_owned());
        input.expression_attribute_names.insert("#score".into(), "score".into());
        input
            .expression_attribute_values
            .insert(":min".into(), AttributeValue::number(15));

        let output = executor.query(input).await.unwrap();
        assert_eq!(output.scanned_count, 2);
        assert_eq!(output.count, 1);
        assert!(!output.last_evaluated_key.is_empty());
    }

    #[tokio::test]
    async fn test_should_update_and_return_new_image() {
        let executor = executor();
        seed(&executor).await;

        let output = executor
            .update_item(UpdateItemInput {
                table_name: "t".to_owned(),
                key: Key::from([
                    ("pk".to_owned(), AttributeValue::from("p")),
                    ("sk".to_owned(), AttributeValue::from("a")),
                ]),
                update_expression: Some("ADD #score :one".to_owned()),
                expression_attribute_names: HashMap::from([(
                    "#score".to_owned(),
                    "score".to_owned(),
                )]),
                expression_attribute_values: HashMap::from([(
                    ":one".to_owned(),
                    AttributeValue::number(1),
                )]),
                return_values: Some(ReturnValue::AllNew),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(output.attributes.get("score"), Some(&AttributeValue::number(31)));
    }

    #[tokio::test]
    async fn test_should_reject_oversized_bulk_write() {
        let executor = executor();
        let requests = (0..26)
            .map(|i| WriteRequest::put(item("p", &format!("{i}"), i)))
            .collect();
        let err = executor
            .batch_write_item(BatchWriteItemInput::for_table("t", requests))
            .await
            .unwrap_err();
        assert_eq!(err.code, tablekit_model::StoreErrorCode::Validation);
        assert_eq!(executor.item_count("t"), 0);
    }

    #[tokio::test]
    async fn test_should_report_unknown_table() {
        let err = executor()
            .get_item(GetItemInput {
                table_name: "nope".to_owned(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, tablekit_model::StoreErrorCode::ResourceNotFound);
    }
}
