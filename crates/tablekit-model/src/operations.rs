//! The request kinds an executor must support.

use std::fmt;

/// Every request kind the access layer issues against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read one item by primary key.
    GetItem,
    /// Conditionally write one whole item.
    PutItem,
    /// Conditionally delete one item.
    DeleteItem,
    /// Conditionally apply a partial update to one item.
    UpdateItem,
    /// Read one page of a key range.
    Query,
    /// Write or delete up to the per-request limit of items.
    BatchWriteItem,
}

impl Operation {
    /// Returns the operation name string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetItem => "GetItem",
            Self::PutItem => "PutItem",
            Self::DeleteItem => "DeleteItem",
            Self::UpdateItem => "UpdateItem",
            Self::Query => "Query",
            Self::BatchWriteItem => "BatchWriteItem",
        }
    }

    /// Whether the request mutates the store.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::GetItem | Self::Query)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
