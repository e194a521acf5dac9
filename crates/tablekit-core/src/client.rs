//! The table client and its single-item operations.

use std::fmt;
use std::sync::Arc;

use tablekit_model::input::{DeleteItemInput, GetItemInput, PutItemInput, UpdateItemInput};
use tablekit_model::types::{ExpressionAttributeNames, ExpressionAttributeValues, ReturnValue};
use tablekit_model::{AttributeValue, Item, Key, Operation};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::config::TableConfig;
use crate::error::{TableError, TableResult};
use crate::executor::RequestExecutor;
use crate::expression::{Placeholders, merge_condition};
use crate::gate;
use crate::query::QueryOptions;
use crate::schema::{KeyResolver, Resolved};

/// Replacement function applied by a transform update.
pub type Transform = Box<dyn FnOnce(Item) -> Item + Send>;

/// Options for [`TableClient::put`].
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct PutOptions {
    /// Replace an existing item instead of failing with a conflict.
    #[builder(default)]
    pub overwrite: bool,

    /// Extra condition merged with the create guard.
    #[builder(default, setter(strip_option, into))]
    pub condition: Option<String>,

    /// Name placeholders referenced by `condition`.
    #[builder(default)]
    pub names: ExpressionAttributeNames,

    /// Value placeholders referenced by `condition`.
    #[builder(default)]
    pub values: ExpressionAttributeValues,
}

/// Options for [`TableClient::delete`].
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct DeleteOptions {
    /// Extra condition merged with the timestamp guard.
    #[builder(default, setter(strip_option, into))]
    pub condition: Option<String>,

    /// Name placeholders referenced by `condition`.
    #[builder(default)]
    pub names: ExpressionAttributeNames,

    /// Value placeholders referenced by `condition`.
    #[builder(default)]
    pub values: ExpressionAttributeValues,
}

/// Options for [`TableClient::update`].
///
/// Exactly one of a transform or an update expression must be given.
///
/// # Examples
///
/// ```
/// use tablekit_core::UpdateOptions;
/// use tablekit_model::AttributeValue;
///
/// let by_expression = UpdateOptions::expression("SET #n = #n + :one")
///     .name("#n", "visits")
///     .value(":one", AttributeValue::number(1));
/// assert!(by_expression.validate().is_ok());
///
/// let by_transform = UpdateOptions::transform(|mut item| {
///     item.insert("status".into(), "active".into());
///     item
/// })
/// .upsert(true);
/// assert!(by_transform.validate().is_ok());
///
/// assert!(UpdateOptions::default().validate().is_err());
/// ```
#[derive(Default)]
pub struct UpdateOptions {
    /// Create the item when it does not exist.
    pub upsert: bool,
    /// Full-replacement function applied to the current item.
    pub transform: Option<Transform>,
    /// Partial update expression sent to the store.
    pub expression: Option<String>,
    /// Extra condition merged with the concurrency guard.
    pub condition: Option<String>,
    /// Name placeholders referenced by `expression` or `condition`.
    pub names: ExpressionAttributeNames,
    /// Value placeholders referenced by `expression` or `condition`.
    pub values: ExpressionAttributeValues,
}

impl UpdateOptions {
    /// Update by replacing the item with `f(current)`.
    #[must_use]
    pub fn transform(f: impl FnOnce(Item) -> Item + Send + 'static) -> Self {
        Self {
            transform: Some(Box::new(f)),
            ..Self::default()
        }
    }

    /// Update by applying an update expression.
    #[must_use]
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Self::default()
        }
    }

    /// Create the item when it does not exist.
    #[must_use]
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Merge an extra condition with the concurrency guard.
    #[must_use]
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Bind a `#name` placeholder.
    #[must_use]
    pub fn name(mut self, token: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.names.insert(token.into(), attribute.into());
        self
    }

    /// Bind a `:value` placeholder.
    #[must_use]
    pub fn value(mut self, token: impl Into<String>, value: AttributeValue) -> Self {
        self.values.insert(token.into(), value);
        self
    }

    /// Check that exactly one update mode is selected.
    pub fn validate(&self) -> TableResult<()> {
        let has_expression = self
            .expression
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty());
        match (self.transform.is_some(), has_expression) {
            (true, true) => Err(TableError::usage(
                "transform and update expression are mutually exclusive",
            )),
            (false, false) => Err(TableError::usage(
                "update requires either a transform or an update expression",
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for UpdateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateOptions")
            .field("upsert", &self.upsert)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("expression", &self.expression)
            .field("condition", &self.condition)
            .field("names", &self.names)
            .field("values", &self.values)
            .finish()
    }
}

/// Access layer for one table.
///
/// Cloning is cheap; clones share the configuration and the executor.
#[derive(Debug, Clone)]
pub struct TableClient {
    pub(crate) config: Arc<TableConfig>,
    pub(crate) executor: Arc<dyn RequestExecutor>,
}

impl TableClient {
    /// Create a client after validating `config`.
    pub fn new(config: TableConfig, executor: Arc<dyn RequestExecutor>) -> TableResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            executor,
        })
    }

    /// The client's configuration.
    #[must_use]
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Resolver over the configured key schema and indexes.
    #[must_use]
    pub fn resolver(&self) -> KeyResolver<'_> {
        KeyResolver::new(&self.config.schema, &self.config.indexes)
    }

    /// Which key schema `item` addresses.
    #[must_use]
    pub fn resolve(&self, item: &Item) -> Resolved<'_> {
        self.resolver().resolve(item)
    }

    /// Read one item.
    ///
    /// A full primary key is read directly. An index key is looked up with an
    /// equality query on the index and yields its first match.
    pub async fn get(&self, item: &Item) -> TableResult<Option<Item>> {
        self.read(item, false).await
    }

    async fn read(&self, item: &Item, consistent: bool) -> TableResult<Option<Item>> {
        match self.resolve(item) {
            Resolved::Primary(schema) => {
                let key = schema
                    .key_of(item)
                    .ok_or_else(|| TableError::usage("primary key attributes are missing"))?;
                let output = self
                    .executor
                    .get_item(GetItemInput {
                        table_name: self.config.table_name.clone(),
                        key,
                        consistent_read: consistent.then_some(true),
                    })
                    .await?;
                Ok(output.item)
            }
            Resolved::Index(_) => {
                let options = QueryOptions::builder().limit(1).build();
                let result = self.query(item, options).await?;
                Ok(result.items.into_iter().next())
            }
            Resolved::None => Err(TableError::usage(
                "get requires a complete primary or index key",
            )),
        }
    }

    /// Write a whole item, stamping a fresh write timestamp.
    ///
    /// Unless [`PutOptions::overwrite`] is set, the write fails with
    /// [`TableError::ConcurrencyConflict`] when an item with the same
    /// partition key already exists. Returns the stored item.
    pub async fn put(&self, mut item: Item, options: PutOptions) -> TableResult<Item> {
        let schema = &self.config.schema;
        if !schema.matches(&item) {
            return Err(TableError::usage(format!(
                "put requires the primary key attributes {} and {}",
                schema.partition, schema.sort
            )));
        }

        let mut placeholders = Placeholders::with_caller(options.names, options.values);
        let mut condition = if options.overwrite {
            String::new()
        } else {
            gate::create_guard(&mut placeholders, &schema.partition)
        };
        if let Some(extra) = options.condition.as_deref() {
            condition = merge_condition(&condition, extra);
        }

        gate::stamp(&mut item, gate::now_millis());
        self.write_item(item, condition, placeholders).await
    }

    /// Delete one item by primary key.
    ///
    /// When the supplied item carries a write timestamp, the delete only
    /// succeeds if the stored item still has it. Returns the deleted item as
    /// reported by the store, `None` when nothing was stored under the key.
    pub async fn delete(&self, item: &Item, options: DeleteOptions) -> TableResult<Option<Item>> {
        let key = self
            .config
            .schema
            .key_of(item)
            .ok_or_else(|| TableError::usage("delete requires the primary key attributes"))?;

        let mut placeholders = Placeholders::with_caller(options.names, options.values);
        let mut condition = gate::timestamp_of(item)
            .map(|ts| gate::delete_guard(&mut placeholders, ts))
            .unwrap_or_default();
        if let Some(extra) = options.condition.as_deref() {
            condition = merge_condition(&condition, extra);
        }
        let (names, values) = placeholders.into_parts();

        debug!(table = %self.config.table_name, operation = %Operation::DeleteItem, "issuing write");
        let output = self
            .executor
            .delete_item(DeleteItemInput {
                table_name: self.config.table_name.clone(),
                key,
                condition_expression: non_empty(condition),
                expression_attribute_names: names,
                expression_attribute_values: values,
                return_values: Some(ReturnValue::AllOld),
            })
            .await
            .map_err(|e| TableError::from_write(&self.config.table_name, e))?;

        Ok((!output.attributes.is_empty()).then_some(output.attributes))
    }

    /// Read-modify-write one item under the optimistic write gate.
    ///
    /// The current item is read first. Without `upsert`, a missing item fails
    /// with [`TableError::NotFound`]. The write is conditioned on the stored
    /// write timestamp being absent or unchanged since the read, so a
    /// concurrent writer makes it fail with [`TableError::ConcurrencyConflict`].
    ///
    /// A transform receives the current item (or the bare key when upserting)
    /// and its output replaces the item; the primary key must be preserved. An
    /// update expression is sent as a partial update with the timestamp
    /// assignment merged in. Either way the item as stored is returned.
    pub async fn update(&self, item: &Item, options: UpdateOptions) -> TableResult<Item> {
        options.validate()?;

        let current = self.read(item, true).await?;
        let schema = &self.config.schema;
        let key = match &current {
            Some(current) => schema.key_of(current),
            None if options.upsert => schema.key_of(item),
            None => {
                return Err(TableError::NotFound {
                    table: self.config.table_name.clone(),
                });
            }
        }
        .ok_or_else(|| TableError::usage("update requires the primary key attributes"))?;

        let read_ts = current.as_ref().and_then(gate::timestamp_of).cloned();
        let ts = gate::next_after(read_ts.as_ref())?;

        let UpdateOptions {
            transform,
            expression,
            condition: extra,
            names,
            values,
            ..
        } = options;

        let mut placeholders = Placeholders::with_caller(names, values);
        let mut condition = gate::concurrency_guard(&mut placeholders, read_ts.as_ref());
        if let Some(extra) = extra.as_deref() {
            condition = merge_condition(&condition, extra);
        }

        if let Some(transform) = transform {
            let base = current.unwrap_or_else(|| key.clone());
            let mut replacement = transform(base);
            if !preserves_key(&replacement, &key) {
                return Err(TableError::usage(
                    "transform must preserve the primary key attributes",
                ));
            }
            gate::stamp(&mut replacement, ts);
            return self.write_item(replacement, condition, placeholders).await;
        }

        let expression = expression.unwrap_or_default();
        let update_expression = gate::stamp_update(&mut placeholders, &expression, ts);
        let (names, values) = placeholders.into_parts();

        debug!(table = %self.config.table_name, operation = %Operation::UpdateItem, "issuing write");
        let output = self
            .executor
            .update_item(UpdateItemInput {
                table_name: self.config.table_name.clone(),
                key,
                update_expression: Some(update_expression),
                condition_expression: non_empty(condition),
                expression_attribute_names: names,
                expression_attribute_values: values,
                return_values: Some(ReturnValue::AllNew),
            })
            .await
            .map_err(|e| TableError::from_write(&self.config.table_name, e))?;
        Ok(output.attributes)
    }

    async fn write_item(
        &self,
        item: Item,
        condition: String,
        placeholders: Placeholders,
    ) -> TableResult<Item> {
        let (names, values) = placeholders.into_parts();
        debug!(table = %self.config.table_name, operation = %Operation::PutItem, "issuing write");
        self.executor
            .put_item(PutItemInput {
                table_name: self.config.table_name.clone(),
                item: item.clone(),
                condition_expression: non_empty(condition),
                expression_attribute_names: names,
                expression_attribute_values: values,
                return_values: None,
            })
            .await
            .map_err(|e| TableError::from_write(&self.config.table_name, e))?;
        Ok(item)
    }
}

fn preserves_key(item: &Item, key: &Key) -> bool {
    key.iter().all(|(name, value)| item.get(name) == Some(value))
}

fn non_empty(expression: String) -> Option<String> {
    (!expression.trim().is_empty()).then_some(expression)
}
