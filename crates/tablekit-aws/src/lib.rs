//! A [`tablekit_core::RequestExecutor`] backed by the AWS SDK for DynamoDB.
//!
//! [`AwsExecutor`] translates the wire model into SDK calls and SDK failures
//! into [`tablekit_model::StoreError`]. Bulk writes that come back with
//! unprocessed items are resubmitted with exponential backoff before the
//! leftovers are reported.
//!
//! ```no_run
//! # async fn demo() -> Result<(), tablekit_core::TableError> {
//! use std::sync::Arc;
//!
//! use tablekit_aws::{AwsConfig, AwsExecutor};
//! use tablekit_core::{TableClient, TableConfig};
//!
//! let executor = AwsExecutor::from_config(AwsConfig::from_env()).await;
//! let client = TableClient::new(TableConfig::from_env()?, Arc::new(executor))?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod executor;

pub use config::AwsConfig;
pub use executor::AwsExecutor;
