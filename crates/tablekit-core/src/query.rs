//! Paginated query engine.
//!
//! A query is planned once from the partial item: the resolver picks the key
//! schema, the partition and sort values become the key condition, and the
//! caller's fragments are merged in. Pages are then fetched lazily through
//! [`TableClient::pages`]; [`TableClient::query`] drains that stream.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tablekit_model::input::QueryInput;
use tablekit_model::types::{ExpressionAttributeNames, ExpressionAttributeValues};
use tablekit_model::{AttributeValue, Item, Key};
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

use crate::client::TableClient;
use crate::error::{TableError, TableResult};
use crate::executor::RequestExecutor;
use crate::expression::{Placeholders, merge_condition};
use crate::schema::Resolved;

/// Options for a query. Every field is optional.
///
/// # Examples
///
/// ```
/// use tablekit_core::QueryOptions;
///
/// let options = QueryOptions::builder().all(true).limit(2).build();
/// assert!(options.cursor.is_none());
/// ```
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct QueryOptions {
    /// Query this index instead of the one the resolver picks.
    #[builder(default, setter(strip_option, into))]
    pub index: Option<String>,

    /// Extra fragment merged into the key condition.
    #[builder(default, setter(strip_option, into))]
    pub condition: Option<String>,

    /// Filter applied after key matching; does not affect pagination.
    #[builder(default, setter(strip_option, into))]
    pub filter: Option<String>,

    /// Items evaluated per page.
    #[builder(default, setter(strip_option))]
    pub limit: Option<u32>,

    /// Start after this key.
    #[builder(default, setter(strip_option))]
    pub cursor: Option<Key>,

    /// Match the sort key with `begins_with` instead of equality.
    #[builder(default)]
    pub prefix: bool,

    /// Keep following cursors until the range is exhausted.
    #[builder(default)]
    pub all: bool,

    /// Return items in descending sort order.
    #[builder(default)]
    pub descending: bool,

    /// Request strongly consistent reads.
    #[builder(default)]
    pub consistent_read: bool,

    /// Name placeholders referenced by `condition` or `filter`.
    #[builder(default)]
    pub names: ExpressionAttributeNames,

    /// Value placeholders referenced by `condition` or `filter`.
    #[builder(default)]
    pub values: ExpressionAttributeValues,
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Items on this page.
    pub items: Vec<Item>,
    /// Number of items on this page.
    pub count: usize,
    /// Where the next page starts; `None` when the range is exhausted.
    pub cursor: Option<Key>,
}

/// Accumulated results of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Items of every fetched page, in page order.
    pub items: Vec<Item>,
    /// Total number of items fetched.
    pub count: usize,
    /// Cursor of the last fetched page; `None` when the range is exhausted.
    pub cursor: Option<Key>,
}

impl TableClient {
    /// Fetch the first page, or every page in `all` mode.
    pub async fn query(&self, item: &Item, options: QueryOptions) -> TableResult<QueryResult> {
        self.query_with(item, options, |_| {}).await
    }

    /// Like [`TableClient::query`], invoking `on_page` for each page as it
    /// arrives and before the next one is requested.
    pub async fn query_with<F>(
        &self,
        item: &Item,
        options: QueryOptions,
        mut on_page: F,
    ) -> TableResult<QueryResult>
    where
        F: FnMut(&Page),
    {
        let mut pages = self.pages(item, options)?;
        let mut result = QueryResult::default();
        while let Some(page) = pages.try_next().await? {
            on_page(&page);
            result.count += page.count;
            result.items.extend(page.items);
            result.cursor = page.cursor;
        }
        Ok(result)
    }

    /// A lazy stream of pages.
    ///
    /// Planning errors are returned immediately. The first page is requested on
    /// the first poll; in `all` mode each following page is requested only when
    /// the stream is polled again, so a consumer may act on one page (delete its
    /// items, say) before the cursor advances.
    pub fn pages(
        &self,
        item: &Item,
        options: QueryOptions,
    ) -> TableResult<BoxStream<'static, TableResult<Page>>> {
        let all = options.all;
        let input = self.plan_query(item, options)?;
        Ok(page_stream(Arc::clone(&self.executor), input, all))
    }

    /// Build the first page request for `item`.
    pub(crate) fn plan_query(&self, item: &Item, options: QueryOptions) -> TableResult<QueryInput> {
        let resolver = self.resolver();
        let resolved = resolver.resolve(item);

        let (index_name, partition, sort, sort_type) = match (resolved, options.index) {
            (Resolved::Primary(schema), override_index) => {
                if let Some(name) = override_index {
                    debug!(table = %self.config.table_name, index = %name, "index override ignored for primary key match");
                }
                (None, schema.partition.as_str(), Some(schema.sort.as_str()), &schema.sort_type)
            }
            (Resolved::Index(index), override_index) => (
                Some(override_index.unwrap_or_else(|| index.name.clone())),
                index.partition.as_str(),
                Some(index.sort.as_str()),
                &index.sort_type,
            ),
            (Resolved::None, Some(name)) => {
                let index = resolver
                    .index(&name)
                    .ok_or_else(|| TableError::usage(format!("unknown index {name}")))?;
                if !item.contains_key(&index.partition) {
                    return Err(TableError::usage(format!(
                        "index {name} requires attribute {}",
                        index.partition
                    )));
                }
                let sort = item.contains_key(&index.sort).then_some(index.sort.as_str());
                (Some(name), index.partition.as_str(), sort, &index.sort_type)
            }
            (Resolved::None, None) => {
                let mut attrs: Vec<&str> = item.keys().map(String::as_str).collect();
                attrs.sort_unstable();
                return Err(TableError::usage(format!(
                    "no key schema matches attributes [{}]",
                    attrs.join(", ")
                )));
            }
        };

        let mut placeholders = Placeholders::with_caller(options.names, options.values);
        let mut key_condition = String::new();
        if let Some(value) = item.get(partition) {
            let name = placeholders.name(partition);
            let token = placeholders.value(partition, value.clone());
            key_condition = format!("{name} = {token}");
        }

        if let Some((sort, value)) = sort.and_then(|s| item.get(s).map(|v| (s, v))) {
            let clause = if !options.prefix {
                let name = placeholders.name(sort);
                let token = placeholders.value(sort, value.clone());
                Some(format!("{name} = {token}"))
            } else if is_placeholder(value) {
                None
            } else if !sort_type.supports_prefix() {
                return Err(TableError::usage(format!(
                    "prefix match is not defined for {sort_type} sort key {sort}"
                )));
            } else {
                let name = placeholders.name(sort);
                let token = placeholders.value(sort, value.clone());
                Some(format!("begins_with({name}, {token})"))
            };
            if let Some(clause) = clause {
                key_condition = merge_condition(&key_condition, &clause);
            }
        }

        if let Some(extra) = options.condition.as_deref() {
            key_condition = merge_condition(&key_condition, extra);
        }
        trace!(key_condition = %key_condition, filter = ?options.filter, "planned query");

        let limit = match options.limit {
            Some(0) => return Err(TableError::usage("page limit must be positive")),
            Some(n) => Some(i32::try_from(n).unwrap_or(i32::MAX)),
            None => None,
        };

        let (names, values) = placeholders.into_parts();
        Ok(QueryInput {
            table_name: self.config.table_name.clone(),
            index_name,
            key_condition_expression: Some(key_condition),
            filter_expression: options.filter.filter(|f| !f.trim().is_empty()),
            expression_attribute_names: names,
            expression_attribute_values: values,
            scan_index_forward: options.descending.then_some(false),
            limit,
            exclusive_start_key: options.cursor.unwrap_or_default(),
            consistent_read: options.consistent_read.then_some(true),
        })
    }
}

/// A sort value that stands for "any": the empty string, empty binary, or `NULL`.
fn is_placeholder(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::S(s) => s.is_empty(),
        AttributeValue::B(b) => b.is_empty(),
        AttributeValue::Null(_) => true,
        _ => false,
    }
}

fn page_stream(
    executor: Arc<dyn RequestExecutor>,
    input: QueryInput,
    all: bool,
) -> BoxStream<'static, TableResult<Page>> {
    stream::try_unfold(Some((input, 1_usize)), move |state| {
        let executor = Arc::clone(&executor);
        async move {
            let Some((input, number)) = state else {
                return Ok(None);
            };
            let output = executor.query(input.clone()).await?;
            let cursor = (!output.last_evaluated_key.is_empty()).then_some(output.last_evaluated_key);
            debug!(
                table = %input.table_name,
                index = ?input.index_name,
                page = number,
                count = output.items.len(),
                has_cursor = cursor.is_some(),
                "fetched query page"
            );

            let next = match (&cursor, all) {
                (Some(key), true) => Some((
                    QueryInput {
                        exclusive_start_key: key.clone(),
                        ..input
                    },
                    number + 1,
                )),
                _ => None,
            };
            let page = Page {
                count: output.items.len(),
                items: output.items,
                cursor,
            };
            Ok::<_, TableError>(Some((page, next)))
        }
    })
    .boxed()
}
