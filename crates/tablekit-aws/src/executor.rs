//! [`RequestExecutor`] over the AWS SDK client.

use std::collections::HashMap;
use std::time::Duration;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::WriteRequest as SdkWriteRequest;
use tablekit_core::RequestExecutor;
use tablekit_model::StoreError;
use tablekit_model::input::{
    BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput, QueryInput, UpdateItemInput,
};
use tablekit_model::output::{
    BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput, QueryOutput,
    UpdateItemOutput,
};
use tracing::{debug, warn};

use crate::config::AwsConfig;
use crate::convert::{
    item_from_sdk, item_to_sdk, non_empty, return_value, write_request_from_sdk,
    write_request_to_sdk,
};
use crate::error::map_sdk_error;

/// Sends requests through an [`aws_sdk_dynamodb::Client`].
#[derive(Debug, Clone)]
pub struct AwsExecutor {
    client: Client,
    config: AwsConfig,
}

impl AwsExecutor {
    /// Wrap an existing SDK client.
    #[must_use]
    pub fn new(client: Client, config: AwsConfig) -> Self {
        Self { client, config }
    }

    /// Build an SDK client from the default credential chain, the configured
    /// region, and the optional endpoint override.
    pub async fn from_config(config: AwsConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let shared = loader.load().await;
        Self::new(Client::new(&shared), config)
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Delay before resubmission `attempt` (0-based): doubles from `initial_ms`
/// and saturates at `max_ms`.
pub(crate) fn retry_delay(attempt: usize, initial_ms: u64, max_ms: u64) -> Duration {
    let factor = 1_u64.checked_shl(u32::try_from(attempt).unwrap_or(u32::MAX)).unwrap_or(u64::MAX);
    Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
}

fn pending_count(items: &HashMap<String, Vec<SdkWriteRequest>>) -> usize {
    items.values().map(Vec::len).sum()
}

#[async_trait::async_trait]
impl RequestExecutor for AwsExecutor {
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(input.table_name)
            .set_key(Some(item_to_sdk(input.key)))
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(GetItemOutput {
            item: output.item.map(item_from_sdk).transpose()?,
        })
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, StoreError> {
        let output = self
            .client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(item_to_sdk(input.item)))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .set_expression_attribute_values(
                non_empty(input.expression_attribute_values).map(item_to_sdk),
            )
            .set_return_values(input.return_values.map(return_value))
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(PutItemOutput {
            attributes: item_from_sdk(output.attributes.unwrap_or_default())?,
        })
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, StoreError> {
        let output = self
            .client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(item_to_sdk(input.key)))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .set_expression_attribute_values(
                non_empty(input.expression_attribute_values).map(item_to_sdk),
            )
            .set_return_values(input.return_values.map(return_value))
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(DeleteItemOutput {
            attributes: item_from_sdk(output.attributes.unwrap_or_default())?,
        })
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, StoreError> {
        let output = self
            .client
            .update_item()
            .table_name(input.table_name)
            .set_key(Some(item_to_sdk(input.key)))
            .set_update_expression(input.update_expression)
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .set_expression_attribute_values(
                non_empty(input.expression_attribute_values).map(item_to_sdk),
            )
            .set_return_values(input.return_values.map(return_value))
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(UpdateItemOutput {
            attributes: item_from_sdk(output.attributes.unwrap_or_default())?,
        })
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_key_condition_expression(input.key_condition_expression)
            .set_filter_expression(input.filter_expression)
            .set_expression_attribute_names(non_empty(input.expression_attribute_names))
            .set_expression_attribute_values(
                non_empty(input.expression_attribute_values).map(item_to_sdk),
            )
            .set_scan_index_forward(input.scan_index_forward)
            .set_limit(input.limit)
            .set_exclusive_start_key(non_empty(input.exclusive_start_key).map(item_to_sdk))
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(item_from_sdk)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryOutput {
            items,
            count: output.count,
            scanned_count: output.scanned_count,
            last_evaluated_key: item_from_sdk(output.last_evaluated_key.unwrap_or_default())?,
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError> {
        let mut pending = input
            .request_items
            .into_iter()
            .map(|(table, requests)| {
                let requests = requests
                    .into_iter()
                    .map(write_request_to_sdk)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((table, requests))
            })
            .collect::<Result<HashMap<_, _>, StoreError>>()?;

        let mut attempt = 0;
        loop {
            let output = self
                .client
                .batch_write_item()
                .set_request_items(Some(pending))
                .send()
                .await
                .map_err(map_sdk_error)?;

            let unprocessed: HashMap<_, _> = output
                .unprocessed_items
                .unwrap_or_default()
                .into_iter()
                .filter(|(_, requests)| !requests.is_empty())
                .collect();
            let remaining = pending_count(&unprocessed);
            if remaining == 0 {
                return Ok(BatchWriteItemOutput::default());
            }

            if attempt >= self.config.max_unprocessed_retries {
                warn!(remaining, attempt, "giving up on unprocessed writes");
                let unprocessed_items = unprocessed
                    .into_iter()
                    .map(|(table, requests)| {
                        let requests = requests
                            .into_iter()
                            .map(write_request_from_sdk)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok((table, requests))
                    })
                    .collect::<Result<HashMap<_, _>, StoreError>>()?;
                return Ok(BatchWriteItemOutput { unprocessed_items });
            }

            let delay = retry_delay(
                attempt,
                self.config.initial_backoff_ms,
                self.config.max_backoff_ms,
            );
            debug!(remaining, attempt, ?delay, "resubmitting unprocessed writes");
            tokio::time::sleep(delay).await;
            attempt += 1;
            pending = unprocessed;
        }
    }
}
