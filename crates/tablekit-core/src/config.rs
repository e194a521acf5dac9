//! Table client configuration.
//!
//! A [`TableConfig`] names the table, declares its primary key and ordered
//! secondary indexes, and bounds the bulk-write group size. It is immutable for
//! the lifetime of a [`crate::TableClient`]. Configuration can be built in code,
//! parsed from JSON, or loaded from environment variables.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{TableError, TableResult};
use crate::schema::{IndexDefinition, TableSchema};

/// Largest number of write requests the store accepts in one bulk write.
pub const MAX_BATCH_SIZE: usize = 25;

/// Table client configuration.
///
/// # Examples
///
/// ```
/// use tablekit_core::{IndexDefinition, TableConfig, TableSchema};
///
/// let config = TableConfig::builder()
///     .table_name("users".into())
///     .schema(TableSchema::new("pk", "sk"))
///     .indexes(vec![IndexDefinition::new("byEmail", "email", "sk")])
///     .build();
/// assert_eq!(config.batch_size, 25);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Name of the table.
    pub table_name: String,

    /// Primary composite key.
    pub schema: TableSchema,

    /// Secondary indexes in resolution order.
    #[builder(default)]
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,

    /// Write requests per bulk-write group.
    #[builder(default = MAX_BATCH_SIZE)]
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

impl TableConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablekit_core::TableConfig;
    ///
    /// let config = TableConfig::from_json(
    ///     r#"{"tableName":"users","schema":{"partition":"pk","sort":"sk"}}"#,
    /// )
    /// .unwrap();
    /// assert!(config.indexes.is_empty());
    /// ```
    pub fn from_json(json: &str) -> TableResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TableError::Config(format!("invalid table configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `TABLEKIT_TABLE_NAME` | required |
    /// | `TABLEKIT_PARTITION_KEY` | `pk` |
    /// | `TABLEKIT_SORT_KEY` | `sk` |
    /// | `TABLEKIT_INDEXES` | `[]` (JSON array of index definitions) |
    /// | `TABLEKIT_BATCH_SIZE` | `25` |
    pub fn from_env() -> TableResult<Self> {
        let table_name = std::env::var("TABLEKIT_TABLE_NAME")
            .map_err(|_| TableError::Config("TABLEKIT_TABLE_NAME is not set".to_owned()))?;
        let partition = env_or("TABLEKIT_PARTITION_KEY", "pk");
        let sort = env_or("TABLEKIT_SORT_KEY", "sk");

        let indexes = match std::env::var("TABLEKIT_INDEXES") {
            Ok(v) => serde_json::from_str(&v)
                .map_err(|e| TableError::Config(format!("invalid TABLEKIT_INDEXES: {e}")))?,
            Err(_) => Vec::new(),
        };
        let batch_size = match std::env::var("TABLEKIT_BATCH_SIZE") {
            Ok(v) => v
                .parse()
                .map_err(|e| TableError::Config(format!("invalid TABLEKIT_BATCH_SIZE: {e}")))?,
            Err(_) => MAX_BATCH_SIZE,
        };

        let config = Self {
            table_name,
            schema: TableSchema::new(partition, sort),
            indexes,
            batch_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject empty names, duplicate index names, invalid key types and
    /// group sizes outside `1..=25`.
    pub fn validate(&self) -> TableResult<()> {
        if self.table_name.trim().is_empty() {
            return Err(TableError::Config("table name must not be empty".to_owned()));
        }
        if self.schema.partition.is_empty() || self.schema.sort.is_empty() {
            return Err(TableError::Config(
                "primary key attribute names must not be empty".to_owned(),
            ));
        }
        if !self.schema.sort_type.is_valid_key_type() {
            return Err(TableError::Config(format!(
                "invalid sort key type {} for the primary key",
                self.schema.sort_type
            )));
        }

        let mut seen = HashSet::new();
        for index in &self.indexes {
            if index.name.is_empty() || index.partition.is_empty() || index.sort.is_empty() {
                return Err(TableError::Config(format!(
                    "index {:?} has an empty name or key attribute",
                    index.name
                )));
            }
            if !index.sort_type.is_valid_key_type() {
                return Err(TableError::Config(format!(
                    "invalid sort key type {} for index {}",
                    index.sort_type, index.name
                )));
            }
            if !seen.insert(index.name.as_str()) {
                return Err(TableError::Config(format!(
                    "duplicate index name {}",
                    index.name
                )));
            }
        }

        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(TableError::Config(format!(
                "batch size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use tablekit_model::types::ScalarAttributeType;

    use super::*;

    fn config() -> TableConfig {
        TableConfig::builder()
            .table_name("users".into())
            .schema(TableSchema::new("pk", "sk"))
            .indexes(vec![IndexDefinition::new("idx", "pk", "lsiSk")])
            .build()
    }

    #[test]
    fn test_should_default_batch_size_to_store_limit() {
        let config = config();
        assert_eq!(config.batch_size, MAX_BATCH_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_parse_json_with_defaults() {
        let config = TableConfig::from_json(
            r#"{
                "tableName": "users",
                "schema": {"partition": "pk", "sort": "sk"},
                "indexes": [{"name": "byScore", "partition": "pk", "sort": "score", "sortType": "N"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.table_name, "users");
        assert_eq!(config.schema.sort_type, ScalarAttributeType::S);
        assert_eq!(config.indexes[0].sort_type, ScalarAttributeType::N);
        assert_eq!(config.batch_size, 25);
    }

    #[test]
    fn test_should_reject_out_of_range_batch_size() {
        let mut config = config();
        config.batch_size = 26;
        assert!(matches!(config.validate(), Err(TableError::Config(_))));
        config.batch_size = 0;
        assert!(matches!(config.validate(), Err(TableError::Config(_))));
    }

    #[test]
    fn test_should_reject_duplicate_index_names() {
        let mut config = config();
        config.indexes.push(IndexDefinition::new("idx", "gpk", "gsk"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate index name idx"));
    }

    #[test]
    fn test_should_reject_empty_table_name() {
        let err = TableConfig::from_json(r#"{"tableName":" ","schema":{"partition":"pk","sort":"sk"}}"#)
            .unwrap_err();
        assert!(matches!(err, TableError::Config(_)));
    }

    #[test]
    fn test_should_reject_unknown_key_type() {
        let mut config = config();
        config.indexes[0].sort_type = ScalarAttributeType::Unknown("BOOL".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_roundtrip_camel_case_json() {
        let json = serde_json::to_string(&config()).unwrap();
        assert!(json.contains("\"tableName\":\"users\""));
        assert!(json.contains("\"batchSize\":25"));
    }
}
