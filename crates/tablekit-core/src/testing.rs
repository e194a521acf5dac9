//! Fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Once};

use parking_lot::Mutex;
use tablekit_model::input::{
    BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput, QueryInput, UpdateItemInput,
};
use tablekit_model::output::{
    BatchWriteItemOutput, DeleteItemOutput, GetItemOutput, PutItemOutput, QueryOutput,
    UpdateItemOutput,
};
use tablekit_model::{AttributeValue, Item, Operation, StoreError, StoreErrorCode};

use crate::client::TableClient;
use crate::config::TableConfig;
use crate::executor::RequestExecutor;
use crate::memory::MemoryExecutor;
use crate::schema::{IndexDefinition, TableSchema};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A failure injected in place of forwarding a request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Fault {
    /// The bulk write is accepted but none of its writes are applied.
    Unprocessed,
    /// The request fails with this code.
    Error(StoreErrorCode),
}

impl Fault {
    fn into_error(self, operation: Operation) -> StoreError {
        let code = match self {
            Self::Error(code) => code,
            Self::Unprocessed => StoreErrorCode::Internal,
        };
        StoreError::with_message(code, format!("injected {operation} failure"))
    }
}

/// Wraps a [`MemoryExecutor`] and records every request it forwards.
///
/// Calls scheduled with [`RecordingExecutor::fail_at`] fail instead of
/// reaching the inner executor.
#[derive(Debug)]
pub(crate) struct RecordingExecutor {
    inner: MemoryExecutor,
    counts: Mutex<HashMap<Operation, usize>>,
    batch_sizes: Mutex<Vec<usize>>,
    faults: Mutex<HashMap<(Operation, usize), Fault>>,
}

impl RecordingExecutor {
    pub(crate) fn new(inner: MemoryExecutor) -> Self {
        Self {
            inner,
            counts: Mutex::new(HashMap::new()),
            batch_sizes: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Make the `nth` (1-based, counted since the last reset) call of
    /// `operation` fail with `fault`.
    pub(crate) fn fail_at(&self, operation: Operation, nth: usize, fault: Fault) {
        self.faults.lock().insert((operation, nth), fault);
    }

    pub(crate) fn inner(&self) -> &MemoryExecutor {
        &self.inner
    }

    pub(crate) fn count(&self, operation: Operation) -> usize {
        self.counts.lock().get(&operation).copied().unwrap_or(0)
    }

    pub(crate) fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }

    /// Sizes of the bulk writes issued so far, in order.
    pub(crate) fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }

    pub(crate) fn reset(&self) {
        self.counts.lock().clear();
        self.batch_sizes.lock().clear();
    }

    /// Count the call and take the fault scheduled for it, if any.
    fn next_fault(&self, operation: Operation) -> Option<Fault> {
        let nth = {
            let mut counts = self.counts.lock();
            let nth = counts.entry(operation).or_default();
            *nth += 1;
            *nth
        };
        self.faults.lock().remove(&(operation, nth))
    }

    fn record(&self, operation: Operation) -> Result<(), StoreError> {
        match self.next_fault(operation) {
            Some(fault) => Err(fault.into_error(operation)),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RequestExecutor for RecordingExecutor {
    async fn get_item(&self, input: GetItemInput) -> Result<GetItemOutput, StoreError> {
        self.record(Operation::GetItem)?;
        self.inner.get_item(input).await
    }

    async fn put_item(&self, input: PutItemInput) -> Result<PutItemOutput, StoreError> {
        self.record(Operation::PutItem)?;
        self.inner.put_item(input).await
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<DeleteItemOutput, StoreError> {
        self.record(Operation::DeleteItem)?;
        self.inner.delete_item(input).await
    }

    async fn update_item(&self, input: UpdateItemInput) -> Result<UpdateItemOutput, StoreError> {
        self.record(Operation::UpdateItem)?;
        self.inner.update_item(input).await
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, StoreError> {
        self.record(Operation::Query)?;
        self.inner.query(input).await
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> Result<BatchWriteItemOutput, StoreError> {
        self.batch_sizes.lock().push(input.len());
        match self.next_fault(Operation::BatchWriteItem) {
            Some(Fault::Unprocessed) => Ok(BatchWriteItemOutput {
                unprocessed_items: input.request_items,
            }),
            Some(fault) => Err(fault.into_error(Operation::BatchWriteItem)),
            None => self.inner.batch_write_item(input).await,
        }
    }
}

/// A client over table `users` keyed by `pk`/`sk`, backed by a recorder.
pub(crate) fn client_with(indexes: Vec<IndexDefinition>) -> (TableClient, Arc<RecordingExecutor>) {
    init_tracing();
    let config = TableConfig::builder()
        .table_name("users".into())
        .schema(TableSchema::new("pk", "sk"))
        .indexes(indexes)
        .build();
    let recorder = Arc::new(RecordingExecutor::new(MemoryExecutor::for_config(&config)));
    let executor: Arc<dyn RequestExecutor> = recorder.clone();
    let client = TableClient::new(config, executor).expect("valid test config");
    (client, recorder)
}

/// An item of string attributes.
pub(crate) fn item(attrs: &[(&str, &str)]) -> Item {
    attrs
        .iter()
        .map(|(name, value)| ((*name).to_owned(), AttributeValue::from(*value)))
        .collect()
}

/// Store `count` items under partition `pk` with sort keys `item#00`, `item#01`, ...
pub(crate) async fn seed(client: &TableClient, pk: &str, count: usize) {
    let items = (0..count)
        .map(|i| item(&[("pk", pk), ("sk", format!("item#{i:02}").as_str())]))
        .collect();
    client.batch_write(items).await.expect("seed items");
}
