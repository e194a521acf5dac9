//! Error taxonomy for table operations.

use tablekit_model::StoreError;

/// Errors surfaced by [`crate::TableClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The call cannot be executed as specified: no key schema matches the
    /// supplied attributes, or mutually exclusive options were combined.
    #[error("usage error: {0}")]
    Usage(String),

    /// An update targeted an item that does not exist and upsert was not requested.
    #[error("item not found in table {table}")]
    NotFound {
        /// The table that was searched.
        table: String,
    },

    /// A conditional write was rejected because the item changed since it was
    /// read, or because a plain create hit an existing item.
    #[error("concurrent modification detected on table {table}: {source}")]
    ConcurrencyConflict {
        /// The table the write targeted.
        table: String,
        /// The store's conditional check failure.
        source: StoreError,
    },

    /// Any other failure reported by the request executor, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] StoreError),

    /// The table configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TableError {
    /// Shorthand for a [`TableError::Usage`] error.
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Whether the error is an optimistic concurrency conflict, the only kind
    /// a caller may resolve by re-reading and retrying.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Classify a failure from a conditional write: conditional check failures
    /// become [`TableError::ConcurrencyConflict`], everything else is transport.
    #[must_use]
    pub(crate) fn from_write(table: &str, err: StoreError) -> Self {
        if err.is_conditional_check_failed() {
            tracing::warn!(table, message = %err.message, "conditional write rejected");
            Self::ConcurrencyConflict {
                table: table.to_owned(),
                source: err,
            }
        } else {
            Self::Transport(err)
        }
    }
}

/// Convenience result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

#[cfg(test)]
mod tests {
    use tablekit_model::StoreErrorCode;

    use super::*;

    #[test]
    fn test_should_classify_conditional_failure_as_conflict() {
        let err = TableError::from_write("users", StoreError::conditional_check_failed("nope"));
        assert!(err.is_conflict());
    }

    #[test]
    fn test_should_pass_other_write_failures_through() {
        let err = TableError::from_write(
            "users",
            StoreError::with_message(StoreErrorCode::ProvisionedThroughputExceeded, "slow down"),
        );
        match err {
            TableError::Transport(inner) => {
                assert_eq!(inner.code, StoreErrorCode::ProvisionedThroughputExceeded);
                assert_eq!(inner.message, "slow down");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
