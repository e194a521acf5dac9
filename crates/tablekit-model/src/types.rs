//! Shared types used by requests and responses.
//!
//! Enum variants map to the `SCREAMING_SNAKE_CASE` wire names through
//! `as_str`. Only `ScalarAttributeType` is deserialized, from table config.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

/// Scalar attribute types allowed for key attributes.
///
/// Unrecognized type names are preserved rather than rejected at
/// deserialization time so that configuration errors can be reported with
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ScalarAttributeType {
    /// String type.
    #[default]
    S,
    /// Number type.
    N,
    /// Binary type.
    B,
    /// An unknown attribute type name.
    Unknown(String),
}

impl ScalarAttributeType {
    /// Returns the wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Returns `true` if this is a valid key attribute type (S, N, or B).
    #[must_use]
    pub fn is_valid_key_type(&self) -> bool {
        matches!(self, Self::S | Self::N | Self::B)
    }

    /// Returns `true` if `begins_with` is defined for values of this type.
    #[must_use]
    pub fn supports_prefix(&self) -> bool {
        matches!(self, Self::S | Self::B)
    }
}

impl Serialize for ScalarAttributeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScalarAttributeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "S" => Ok(Self::S),
            "N" => Ok(Self::N),
            "B" => Ok(Self::B),
            _ => Ok(Self::Unknown(s)),
        }
    }
}

impl std::fmt::Display for ScalarAttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item image a write reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnValue {
    /// Nothing is returned.
    #[default]
    None,
    /// All attributes of the item as they appeared before the operation.
    AllOld,
    /// Only the updated attributes as they appeared before the operation.
    UpdatedOld,
    /// All attributes of the item as they appear after the operation.
    AllNew,
    /// Only the updated attributes as they appear after the operation.
    UpdatedNew,
}

impl ReturnValue {
    /// Returns the wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AllOld => "ALL_OLD",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::AllNew => "ALL_NEW",
            Self::UpdatedNew => "UPDATED_NEW",
        }
    }
}

impl std::fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Bulk write requests

/// One put or delete inside a bulk write.
///
/// Exactly one of `put_request` or `delete_request` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    /// A request to put an item.
    pub put_request: Option<PutRequest>,
    /// A request to delete an item.
    pub delete_request: Option<DeleteRequest>,
}

impl WriteRequest {
    /// A put of the whole item.
    #[must_use]
    pub fn put(item: Item) -> Self {
        Self {
            put_request: Some(PutRequest { item }),
            delete_request: None,
        }
    }

    /// A delete by primary key.
    #[must_use]
    pub fn delete(key: Key) -> Self {
        Self {
            put_request: None,
            delete_request: Some(DeleteRequest { key }),
        }
    }
}

/// Bulk-write put of a whole item.
#[derive(Debug, Clone, PartialEq)]
pub struct PutRequest {
    /// The item attributes to put.
    pub item: Item,
}

/// Bulk-write delete by primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    /// The primary key of the item to delete.
    pub key: Key,
}

// Type aliases for common item shapes

/// An item represented as a map of attribute names to values.
pub type Item = HashMap<String, AttributeValue>;

/// A key represented as a map of key attribute names to values.
pub type Key = HashMap<String, AttributeValue>;

/// `#name` placeholder bindings.
pub type ExpressionAttributeNames = HashMap<String, String>;

/// `:value` placeholder bindings.
pub type ExpressionAttributeValues = HashMap<String, AttributeValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_keep_unknown_scalar_type() {
        let t: ScalarAttributeType = serde_json::from_str(r#""BOOL""#).unwrap();
        assert_eq!(t, ScalarAttributeType::Unknown("BOOL".to_owned()));
        assert!(!t.is_valid_key_type());
    }

    #[test]
    fn test_should_only_allow_prefix_on_strings_and_binary() {
        assert!(ScalarAttributeType::S.supports_prefix());
        assert!(ScalarAttributeType::B.supports_prefix());
        assert!(!ScalarAttributeType::N.supports_prefix());
    }

    #[test]
    fn test_should_build_delete_write_request() {
        let mut key = Key::new();
        key.insert("pk".to_owned(), AttributeValue::from("a"));
        let req = WriteRequest::delete(key.clone());
        assert!(req.put_request.is_none());
        assert_eq!(req.delete_request, Some(DeleteRequest { key }));
    }

    #[test]
    fn test_should_render_return_value_wire_name() {
        assert_eq!(ReturnValue::AllNew.as_str(), "ALL_NEW");
        assert_eq!(ReturnValue::default().to_string(), "NONE");
    }
}
