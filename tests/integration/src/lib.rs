//! Integration tests for tablekit against a DynamoDB-compatible server.
//!
//! These tests require a server at `localhost:4566` (override with
//! `DYNAMODB_ENDPOINT_URL`). They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! Run them with:
//! ```text
//! cargo test -p tablekit-integration -- --ignored
//! ```

use std::sync::{Arc, Once};

use aws_credential_types::Credentials;
use aws_sdk_dynamodb::config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, LocalSecondaryIndex, Projection,
    ProjectionType, ScalarAttributeType,
};
use tablekit_aws::{AwsConfig, AwsExecutor};
use tablekit_core::{IndexDefinition, TableClient, TableConfig, TableSchema};

static INIT: Once = Once::new();

/// Name of the local secondary index created by [`create_test_table`].
pub const EMAIL_INDEX: &str = "byEmail";

/// Initialize tracing (once).
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

/// Endpoint URL for the server.
fn endpoint_url() -> String {
    std::env::var("DYNAMODB_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:4566".to_owned())
}

/// Create a configured DynamoDB client pointing at the local server.
#[must_use]
pub fn dynamodb_client() -> aws_sdk_dynamodb::Client {
    init_tracing();

    let creds = Credentials::new("test", "test", None, None, "integration-test");

    let config = aws_sdk_dynamodb::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .build();

    aws_sdk_dynamodb::Client::from_conf(config)
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Create a `pk`/`sk` table with a local secondary index on `email`.
/// Returns its name. Caller is responsible for cleanup.
pub async fn create_test_table(client: &aws_sdk_dynamodb::Client, prefix: &str) -> String {
    let name = test_table_name(prefix);
    let key = |attribute: &str, key_type: KeyType| {
        KeySchemaElement::builder()
            .attribute_name(attribute)
            .key_type(key_type)
            .build()
            .unwrap()
    };
    let definition = |attribute: &str| {
        AttributeDefinition::builder()
            .attribute_name(attribute)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .unwrap()
    };

    client
        .create_table()
        .table_name(&name)
        .key_schema(key("pk", KeyType::Hash))
        .key_schema(key("sk", KeyType::Range))
        .attribute_definitions(definition("pk"))
        .attribute_definitions(definition("sk"))
        .attribute_definitions(definition("email"))
        .local_secondary_indexes(
            LocalSecondaryIndex::builder()
                .index_name(EMAIL_INDEX)
                .key_schema(key("pk", KeyType::Hash))
                .key_schema(key("email", KeyType::Range))
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .build()
                .unwrap(),
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create table {name}: {e}"));
    name
}

/// A [`TableClient`] for a table created by [`create_test_table`].
#[must_use]
pub fn table_client(client: &aws_sdk_dynamodb::Client, table_name: &str) -> TableClient {
    let config = TableConfig::builder()
        .table_name(table_name.to_owned())
        .schema(TableSchema::new("pk", "sk"))
        .indexes(vec![IndexDefinition::new(EMAIL_INDEX, "pk", "email")])
        .build();
    let executor = AwsExecutor::new(client.clone(), AwsConfig::default());
    TableClient::new(config, Arc::new(executor)).unwrap()
}

/// Delete a table, ignoring failures.
pub async fn cleanup_table(client: &aws_sdk_dynamodb::Client, table_name: &str) {
    let _ = client.delete_table().table_name(table_name).send().await;
}

mod test_batch;
mod test_gate;
mod test_query;
