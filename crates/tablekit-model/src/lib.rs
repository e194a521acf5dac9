//! Wire model types for tablekit.
//!
//! These types describe the requests and responses exchanged with a
//! DynamoDB-compatible store. They are transport-agnostic: an executor turns
//! them into HTTP calls, SDK calls, or in-memory operations.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use attribute_value::AttributeValue;
pub use error::{StoreError, StoreErrorCode};
pub use operations::Operation;
pub use types::{Item, Key};
