//! Schema mapping models.
//!
//! Administrators can alias physical tables, functions and materialized views
//! behind friendlier display names. Mappings arrive from the settings as
//! partials and are validated once when the mapper is built.

use serde::{Deserialize, Serialize};

/// Kind of object a mapping points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaMappingType {
    /// A stored function.
    Function,
    /// A table.
    Table,
    /// A materialized view.
    MaterializedView,
}

/// A complete, validated schema mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMapping {
    /// Kind of the mapped object.
    #[serde(rename = "type")]
    pub mapping_type: SchemaMappingType,
    /// Physical backend name.
    pub name: String,
    /// Value written into queries.
    pub value: String,
    /// Database the object lives in.
    pub database: String,
    /// Name shown to users.
    pub display_name: String,
}

/// A mapping as stored in the settings; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSchemaMapping {
    /// Kind of the mapped object.
    #[serde(rename = "type", default)]
    pub mapping_type: Option<SchemaMappingType>,
    /// Physical backend name.
    #[serde(default)]
    pub name: Option<String>,
    /// Value written into queries.
    #[serde(default)]
    pub value: Option<String>,
    /// Database the object lives in.
    #[serde(default)]
    pub database: Option<String>,
    /// Name shown to users.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl PartialSchemaMapping {
    /// Convert into a complete mapping.
    ///
    /// Returns `None` when any field is missing or empty.
    pub fn validate(&self) -> Option<SchemaMapping> {
        fn present(field: &Option<String>) -> Option<String> {
            field.as_deref().filter(|value| !value.is_empty()).map(String::from)
        }

        Some(SchemaMapping {
            mapping_type: self.mapping_type?,
            name: present(&self.name)?,
            value: present(&self.value)?,
            database: present(&self.database)?,
            display_name: present(&self.display_name)?,
        })
    }
}

impl From<SchemaMapping> for PartialSchemaMapping {
    fn from(mapping: SchemaMapping) -> Self {
        Self {
            mapping_type: Some(mapping.mapping_type),
            name: Some(mapping.name),
            value: Some(mapping.value),
            database: Some(mapping.database),
            display_name: Some(mapping.display_name),
        }
    }
}

/// Candidate mapping offered by the config editor after a schema refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMappingOption {
    /// Text shown in the picker, e.g. `Default/tables/logs`.
    pub label: String,
    /// Value written into queries.
    pub value: String,
    /// Kind of the mapped object.
    #[serde(rename = "type")]
    pub mapping_type: SchemaMappingType,
    /// Physical backend name.
    pub name: String,
    /// Database the object lives in.
    pub database: String,
}
