//! The request executor seam between the access layer and the store.

use std::fmt::Debug;

use tablekit_model::StoreError;
use tablekit_model::input::{
    BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput, QueryInput, UpdateItemInput,
};
use tablekit_model::output::{
    BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput, QueryOutput,
    UpdateItemOutput,
};

/// Sends single requests to the store.
///
/// Implementations own transport concerns such as credentials, retries and
/// timeouts. Failures are reported as [`StoreError`]; a failed condition must
/// use [`tablekit_model::StoreErrorCode::ConditionalCheckFailed`] so the client
/// can surface it as a concurrency conflict.
///
/// Uses `async_trait` to remain object-safe behind `Arc<dyn RequestExecutor>`.
#[async_trait::async_trait]
pub trait RequestExecutor: Send + Sync + Debug {
    /// Read one item by primary key.
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, StoreError>;

    /// Write one whole item, subject to its condition.
    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, StoreError>;

    /// Delete one item by primary key, subject to its condition.
    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, StoreError>;

    /// Apply an update expression to one item, subject to its condition.
    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, StoreError>;

    /// Fetch one page of a range query.
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError>;

    /// Issue one group of at most 25 puts or deletes.
    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError>;
}
