//! Key schema declarations and the key-schema resolver.

use serde::{Deserialize, Serialize};
use tablekit_model::types::ScalarAttributeType;
use tablekit_model::{Item, Key};

/// The table's primary composite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Partition key attribute name.
    pub partition: String,
    /// Sort key attribute name.
    pub sort: String,
    /// Type of the sort key values.
    #[serde(default)]
    pub sort_type: ScalarAttributeType,
}

impl TableSchema {
    /// Schema with string-typed sort values.
    #[must_use]
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
            sort_type: ScalarAttributeType::S,
        }
    }

    /// Whether `item` carries both primary key attributes.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        item.contains_key(&self.partition) && item.contains_key(&self.sort)
    }

    /// Extract the primary key attributes of `item`, if both are present.
    #[must_use]
    pub fn key_of(&self, item: &Item) -> Option<Key> {
        let partition = item.get(&self.partition)?;
        let sort = item.get(&self.sort)?;
        Some(Key::from([
            (self.partition.clone(), partition.clone()),
            (self.sort.clone(), sort.clone()),
        ]))
    }
}

/// A secondary index over the table.
///
/// A local index shares the table's partition attribute; a global index
/// declares its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    /// Index name as known to the store.
    pub name: String,
    /// Partition key attribute name.
    pub partition: String,
    /// Sort key attribute name.
    pub sort: String,
    /// Type of the sort key values.
    #[serde(default)]
    pub sort_type: ScalarAttributeType,
}

impl IndexDefinition {
    /// Index with string-typed sort values.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        partition: impl Into<String>,
        sort: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            partition: partition.into(),
            sort: sort.into(),
            sort_type: ScalarAttributeType::S,
        }
    }

    /// Set the sort value type.
    #[must_use]
    pub fn with_sort_type(mut self, sort_type: ScalarAttributeType) -> Self {
        self.sort_type = sort_type;
        self
    }

    /// Whether `item` carries both index key attributes.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        item.contains_key(&self.partition) && item.contains_key(&self.sort)
    }
}

/// Outcome of key-schema resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// The item carries the full primary key.
    Primary(&'a TableSchema),
    /// The item carries the full key of this index.
    Index(&'a IndexDefinition),
    /// No complete key is present.
    None,
}

impl<'a> Resolved<'a> {
    /// Partition attribute of the resolved key, if any.
    #[must_use]
    pub fn partition(&self) -> Option<&'a str> {
        match *self {
            Self::Primary(schema) => Some(&schema.partition),
            Self::Index(index) => Some(&index.partition),
            Self::None => None,
        }
    }

    /// Sort attribute of the resolved key, if any.
    #[must_use]
    pub fn sort(&self) -> Option<&'a str> {
        match *self {
            Self::Primary(schema) => Some(&schema.sort),
            Self::Index(index) => Some(&index.sort),
            Self::None => None,
        }
    }

    /// Sort value type of the resolved key, if any.
    #[must_use]
    pub fn sort_type(&self) -> Option<&'a ScalarAttributeType> {
        match *self {
            Self::Primary(schema) => Some(&schema.sort_type),
            Self::Index(index) => Some(&index.sort_type),
            Self::None => None,
        }
    }

    /// Name of the resolved index; `None` for the primary key or no match.
    #[must_use]
    pub fn index_name(&self) -> Option<&'a str> {
        match *self {
            Self::Index(index) => Some(&index.name),
            Self::Primary(_) | Self::None => None,
        }
    }

    /// A short label for logs: `primary`, the index name, or `none`.
    #[must_use]
    pub fn target(&self) -> &'a str {
        match *self {
            Self::Primary(_) => "primary",
            Self::Index(index) => &index.name,
            Self::None => "none",
        }
    }
}

/// Picks the key schema a partial item addresses.
///
/// Presence is checked on attribute names only. An empty string or `NULL`
/// still counts, so callers can probe with placeholder values.
#[derive(Debug, Clone, Copy)]
pub struct KeyResolver<'a> {
    schema: &'a TableSchema,
    indexes: &'a [IndexDefinition],
}

impl<'a> KeyResolver<'a> {
    /// Resolver over a primary schema and an ordered index list.
    #[must_use]
    pub fn new(schema: &'a TableSchema, indexes: &'a [IndexDefinition]) -> Self {
        Self { schema, indexes }
    }

    /// Resolve `item` to the primary key, the first matching index in
    /// declaration order, or [`Resolved::None`].
    #[must_use]
    pub fn resolve(&self, item: &Item) -> Resolved<'a> {
        if self.schema.matches(item) {
            return Resolved::Primary(self.schema);
        }
        self.indexes
            .iter()
            .find(|index| index.matches(item))
            .map_or(Resolved::None, Resolved::Index)
    }

    /// Look up a declared index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&'a IndexDefinition> {
        self.indexes.iter().find(|index| index.name == name)
    }
}
