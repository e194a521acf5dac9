//! Client-side access layer for a composite-key store with secondary indexes.
//!
//! [`TableClient`] lets callers address items by partial key information. It
//! picks the index whose keys the item carries, composes condition and update
//! expressions, follows pagination cursors, splits bulk writes into groups the
//! store accepts, and guards every write with a `__ts` write timestamp so that
//! concurrent modifications surface as [`TableError::ConcurrencyConflict`].
//!
//! The store itself is reached through a [`RequestExecutor`]. This crate ships
//! [`MemoryExecutor`] for tests and local use; `tablekit-aws` provides one backed
//! by the AWS SDK.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod expression;
pub mod gate;
pub mod memory;
pub mod query;
pub mod schema;

#[cfg(test)]
mod testing;

pub use client::{DeleteOptions, PutOptions, TableClient, Transform, UpdateOptions};
pub use config::TableConfig;
pub use error::{TableError, TableResult};
pub use executor::RequestExecutor;
pub use expression::{merge_condition, merge_update};
pub use memory::MemoryExecutor;
pub use query::{Page, QueryOptions, QueryResult};
pub use schema::{IndexDefinition, KeyResolver, Resolved, TableSchema};
