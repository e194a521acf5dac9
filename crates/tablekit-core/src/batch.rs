//! Batch engine: grouped bulk writes and query-driven bulk deletes.
//!
//! Groups are issued one at a time, each awaited before the next, so a batch
//! never has more than one bulk request outstanding. A failing group aborts
//! the batch; groups already written stay written.

use futures::TryStreamExt;
use tablekit_model::input::BatchWriteItemInput;
use tablekit_model::types::WriteRequest;
use tablekit_model::{Item, StoreError, StoreErrorCode};
use tracing::debug;

use crate::client::TableClient;
use crate::error::{TableError, TableResult};
use crate::gate;
use crate::query::QueryOptions;

impl TableClient {
    /// Write many items in groups of at most `batch_size`.
    ///
    /// Every item is stamped with the same write timestamp, taken once per
    /// call. Bulk writes are unconditional, so existing items are replaced.
    /// Returns the items as written.
    pub async fn batch_write(&self, mut items: Vec<Item>) -> TableResult<Vec<Item>> {
        let schema = &self.config.schema;
        if let Some(position) = items.iter().position(|item| !schema.matches(item)) {
            return Err(TableError::usage(format!(
                "item {position} lacks the primary key attributes {} and {}",
                schema.partition, schema.sort
            )));
        }

        let ts = gate::now_millis();
        for item in &mut items {
            gate::stamp(item, ts);
        }

        for (group, chunk) in items.chunks(self.config.batch_size).enumerate() {
            let requests = chunk.iter().cloned().map(WriteRequest::put).collect();
            self.write_group(group, requests).await?;
        }
        Ok(items)
    }

    /// Delete every item matching a query.
    ///
    /// The query always runs in fetch-all mode. Each page's items are deleted
    /// by primary key, in groups, before the next page is requested. Returns
    /// the deleted items in page order; no delete request is issued when
    /// nothing matches.
    pub async fn batch_delete(&self, item: &Item, options: QueryOptions) -> TableResult<Vec<Item>> {
        let options = QueryOptions {
            all: true,
            ..options
        };
        let mut pages = self.pages(item, options)?;
        let mut deleted = Vec::new();
        let mut group = 0;

        while let Some(page) = pages.try_next().await? {
            let keys: Vec<_> = page
                .items
                .iter()
                .map(|item| {
                    self.config.schema.key_of(item).ok_or_else(|| {
                        TableError::Transport(StoreError::internal(
                            "query returned an item without its primary key",
                        ))
                    })
                })
                .collect::<TableResult<_>>()?;

            for chunk in keys.chunks(self.config.batch_size) {
                let requests = chunk.iter().cloned().map(WriteRequest::delete).collect();
                self.write_group(group, requests).await?;
                group += 1;
            }
            deleted.extend(page.items);
        }
        Ok(deleted)
    }

    async fn write_group(&self, group: usize, requests: Vec<WriteRequest>) -> TableResult<()> {
        let table = &self.config.table_name;
        debug!(table = %table, group, size = requests.len(), "issuing bulk write group");

        let output = self
            .executor
            .batch_write_item(BatchWriteItemInput::for_table(table.clone(), requests))
            .await?;

        if output.is_complete() {
            return Ok(());
        }
        let pending: usize = output.unprocessed_items.values().map(Vec::len).sum();
        Err(TableError::Transport(StoreError::with_message(
            StoreErrorCode::ProvisionedThroughputExceeded,
            format!("{pending} writes of group {group} were not processed"),
        )))
    }
}
