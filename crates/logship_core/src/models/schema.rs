//! Schema models.
//!
//! Data structures describing the remote database as seen by the query
//! editor: tables, columns, and the recursive shape of dynamic columns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the single logical database each data source instance exposes.
pub const DEFAULT_DATABASE: &str = "Default";

/// Native type tag marking a semi-structured column.
pub const DYNAMIC_TYPE: &str = "dynamic";

/// A column as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name, or an accessor path for expanded dynamic sub-fields.
    #[serde(alias = "Name")]
    pub name: String,
    /// Source-native type tag (e.g. "string", "long", "dynamic").
    #[serde(rename = "type", alias = "Type")]
    pub column_type: String,
}

impl ColumnSchema {
    /// Create a new column.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self { name: name.into(), column_type: column_type.into() }
    }

    /// Check if the column holds semi-structured values.
    pub fn is_dynamic(&self) -> bool {
        self.column_type == DYNAMIC_TYPE
    }
}

/// A table and its columns.
///
/// The column list may still contain unexpanded dynamic columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Physical table name.
    #[serde(alias = "Name")]
    pub name: String,
    /// Columns in backend order.
    #[serde(default, alias = "Columns", alias = "OrderedColumns")]
    pub columns: Vec<ColumnSchema>,
}

/// Complete schema of the logical database behind a data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Database name.
    #[serde(alias = "Name")]
    pub name: String,
    /// All tables in the database.
    #[serde(default, alias = "Tables")]
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    /// Find a table by its physical name.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Check if a table with the given physical name exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }
}

/// Outcome of resolving the columns of a table.
///
/// Keeps "the table is unknown to the schema" apart from "the table exists
/// and has these columns", so callers never confuse an empty result with a
/// failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnLookup {
    /// The table was found; columns have dynamic fields expanded.
    Found(Vec<ColumnSchema>),
    /// No table with that name exists in the fetched schema.
    Empty,
}

impl ColumnLookup {
    /// Check if the table was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Borrow the resolved columns. Unknown tables yield an empty slice.
    pub fn columns(&self) -> &[ColumnSchema] {
        match self {
            Self::Found(columns) => columns,
            Self::Empty => &[],
        }
    }

    /// Consume the lookup and return the columns.
    pub fn into_columns(self) -> Vec<ColumnSchema> {
        match self {
            Self::Found(columns) => columns,
            Self::Empty => Vec::new(),
        }
    }
}

/// Shape of a dynamic column as reported by `buildschema()`.
///
/// A leaf is a single native type, an array lists candidate types observed
/// across rows, and an object maps sub-field names to their own shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDefinition {
    /// A single native type, e.g. `"long"`.
    Leaf(String),
    /// Several candidate shapes, e.g. `["long", "double"]`.
    Array(Vec<SchemaDefinition>),
    /// Named sub-fields, in payload order.
    Object(Vec<(String, SchemaDefinition)>),
}

impl SchemaDefinition {
    /// Build a definition from a JSON value.
    ///
    /// Returns `None` for `null` and for scalars that are not type names.
    /// Array elements and object members that cannot be interpreted are
    /// skipped.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::Leaf(name.clone())),
            Value::Array(items) => {
                Some(Self::Array(items.iter().filter_map(Self::from_json).collect()))
            }
            Value::Object(fields) => Some(Self::Object(
                fields
                    .iter()
                    .filter_map(|(name, value)| Self::from_json(value).map(|def| (name.clone(), def)))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Get the type name if this is a leaf.
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(name) => Some(name),
            _ => None,
        }
    }
}

/// Category a native column type is normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    /// Integer and floating point types.
    Number,
    /// Date and time types.
    DateTime,
    /// Boolean types.
    Boolean,
    /// Duration types.
    TimeSpan,
    /// Everything else.
    String,
}

/// Selectable option rendered by the query editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    /// Text shown to the user.
    pub label: String,
    /// Value written into the query.
    pub value: String,
    /// Normalized type of the option.
    #[serde(rename = "type")]
    pub property_type: PropertyType,
}

impl PropertyDefinition {
    /// Create a string-typed definition.
    pub fn string(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into(), property_type: PropertyType::String }
    }
}

/// Project tables to editor options keyed by their physical names.
pub fn tables_to_definition(tables: &[TableSchema]) -> Vec<PropertyDefinition> {
    tables.iter().map(|table| PropertyDefinition::string(&table.name, &table.name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_database_schema_accepts_both_casings() {
        let lower: DatabaseSchema = serde_json::from_value(json!({
            "name": "Default",
            "tables": [{ "name": "logs", "columns": [{ "name": "msg", "type": "string" }] }]
        }))
        .unwrap();
        let upper: DatabaseSchema = serde_json::from_value(json!({
            "Name": "Default",
            "Tables": [{ "Name": "logs", "OrderedColumns": [{ "Name": "msg", "Type": "string" }] }]
        }))
        .unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.table("logs").unwrap().columns[0], ColumnSchema::new("msg", "string"));
    }

    #[test]
    fn test_schema_definition_from_json() {
        let def = SchemaDefinition::from_json(&json!({
            "host": "string",
            "latency": ["long", "double"],
            "skipped": 12,
        }))
        .unwrap();

        let SchemaDefinition::Object(fields) = def else { panic!("expected object") };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0], ("host".to_string(), SchemaDefinition::Leaf("string".into())));
        assert_eq!(
            fields[1].1,
            SchemaDefinition::Array(vec![
                SchemaDefinition::Leaf("long".into()),
                SchemaDefinition::Leaf("double".into()),
            ])
        );
        assert_eq!(SchemaDefinition::from_json(&Value::Null), None);
    }

    #[test]
    fn test_column_lookup_accessors() {
        let found = ColumnLookup::Found(vec![ColumnSchema::new("a", "string")]);
        assert!(found.is_found());
        assert_eq!(found.columns().len(), 1);
        assert!(ColumnLookup::Empty.columns().is_empty());
        assert!(ColumnLookup::Empty.into_columns().is_empty());
    }
}
