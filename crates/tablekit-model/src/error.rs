//! Structured failures reported by the store.
//!
//! Every executor reports failures as a [`StoreError`]. The code set mirrors the
//! service exception names so that callers can match on the kind without
//! inspecting messages. [`StoreErrorCode::ConditionalCheckFailed`] is the
//! distinguished kind the optimistic write gate relies on.

use std::fmt;

/// Well-known store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum StoreErrorCode {
    /// A condition expression evaluated to false.
    ConditionalCheckFailed,
    /// The table or index does not exist.
    ResourceNotFound,
    /// The request was malformed or violated a constraint.
    #[default]
    Validation,
    /// The request rate exceeded the provisioned throughput.
    ProvisionedThroughputExceeded,
    /// Too many requests against the account.
    RequestLimitExceeded,
    /// An item collection grew past its size limit.
    ItemCollectionSizeLimitExceeded,
    /// The request body could not be (de)serialized.
    Serialization,
    /// The store failed internally, or the transport failed before a response.
    Internal,
}

impl StoreErrorCode {
    /// Returns the service exception name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConditionalCheckFailed => "ConditionalCheckFailedException",
            Self::ResourceNotFound => "ResourceNotFoundException",
            Self::Validation => "ValidationException",
            Self::ProvisionedThroughputExceeded => "ProvisionedThroughputExceededException",
            Self::RequestLimitExceeded => "RequestLimitExceeded",
            Self::ItemCollectionSizeLimitExceeded => "ItemCollectionSizeLimitExceededException",
            Self::Serialization => "SerializationException",
            Self::Internal => "InternalServerError",
        }
    }

    /// Parses a service exception name, accepting the fully-qualified
    /// `namespace#Name` form used in JSON `__type` fields.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.rsplit('#').next().unwrap_or(name);
        match short {
            "ConditionalCheckFailedException" => Some(Self::ConditionalCheckFailed),
            "ResourceNotFoundException" => Some(Self::ResourceNotFound),
            "ValidationException" => Some(Self::Validation),
            "ProvisionedThroughputExceededException" => Some(Self::ProvisionedThroughputExceeded),
            "RequestLimitExceeded" => Some(Self::RequestLimitExceeded),
            "ItemCollectionSizeLimitExceededException" => {
                Some(Self::ItemCollectionSizeLimitExceeded)
            }
            "SerializationException" => Some(Self::Serialization),
            "InternalServerError" => Some(Self::Internal),
            _ => None,
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure reported by the store or by the transport in front of it.
#[derive(Debug)]
pub struct StoreError {
    /// The error code.
    pub code: StoreErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl StoreError {
    /// Create a new error with a custom message.
    #[must_use]
    pub fn with_message(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether this is a conditional check failure.
    #[must_use]
    pub fn is_conditional_check_failed(&self) -> bool {
        self.code == StoreErrorCode::ConditionalCheckFailed
    }

    /// Condition expression evaluated to false.
    #[must_use]
    pub fn conditional_check_failed(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::ConditionalCheckFailed, message)
    }

    /// Table or index not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::ResourceNotFound, message)
    }

    /// Validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::Validation, message)
    }

    /// Internal or transport error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(StoreErrorCode::Internal, message)
    }
}
