//! Native type normalization and dynamic schema flattening.

use crate::models::schema::{ColumnSchema, PropertyType, SchemaDefinition};

/// Map a native column type to the editor's type category.
///
/// Both the engine's lowercase names (`long`, `datetime`) and the CLR-style
/// names reported by schema commands (`Int64`, `DateTime`) are recognized.
/// Anything else is treated as a string.
pub fn to_property_type(native_type: &str) -> PropertyType {
    match native_type {
        "real" | "double" | "decimal" | "int" | "long" | "Int32" | "Int64" | "UInt32"
        | "UInt64" | "Single" | "Double" | "Decimal" => PropertyType::Number,
        "datetime" | "date" | "Datetime" | "DateTime" => PropertyType::DateTime,
        "bool" | "boolean" | "Boolean" => PropertyType::Boolean,
        "timespan" | "time" | "TimeSpan" => PropertyType::TimeSpan,
        _ => PropertyType::String,
    }
}

/// Check if a native type normalizes to a number.
pub fn is_numeric(native_type: &str) -> bool {
    to_property_type(native_type) == PropertyType::Number
}

/// Pick the type to assume when a field was observed with several types.
///
/// `double` or `real` wins when present since it holds every numeric value;
/// otherwise the first candidate is used.
pub fn reconcile_types(candidates: &[SchemaDefinition]) -> Option<&SchemaDefinition> {
    candidates
        .iter()
        .find(|candidate| matches!(candidate.as_leaf(), Some("double" | "real")))
        .or_else(|| candidates.first())
}

/// A dynamic field whose observed types disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaWarning {
    /// Accessor path of the field
    pub column: String,
    /// Observed candidate types
    pub candidates: Vec<String>,
    /// Type assumed for the field
    pub assumed: String,
}

/// Flattens dynamic column shapes into accessor-path columns.
#[derive(Debug, Default)]
pub struct SchemaRecorder {
    columns: Vec<ColumnSchema>,
    warnings: Vec<SchemaWarning>,
}

impl SchemaRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the columns described by `schema` under `column_name`.
    ///
    /// Objects recurse into `column_name["field"]` paths; leaves and
    /// candidate lists produce a single column.
    pub fn record(&mut self, column_name: &str, schema: &SchemaDefinition) {
        match schema {
            SchemaDefinition::Leaf(native_type) => {
                self.columns.push(ColumnSchema::new(column_name, native_type.as_str()));
            }
            SchemaDefinition::Array(candidates) => self.record_array(column_name, candidates),
            SchemaDefinition::Object(fields) => {
                for (name, sub_schema) in fields {
                    self.record(&format!("{column_name}[\"{name}\"]"), sub_schema);
                }
            }
        }
    }

    fn record_array(&mut self, column_name: &str, candidates: &[SchemaDefinition]) {
        let Some(assumed) = reconcile_types(candidates) else {
            tracing::warn!(column = column_name, "Dynamic schema has no candidate types, skipping");
            return;
        };

        let all_numeric = candidates
            .iter()
            .all(|candidate| candidate.as_leaf().is_some_and(is_numeric));
        if candidates.len() > 1 && !all_numeric {
            let warning = SchemaWarning {
                column: column_name.to_string(),
                candidates: candidates.iter().map(describe).collect(),
                assumed: describe(assumed),
            };
            tracing::warn!(
                column = column_name,
                candidates = ?warning.candidates,
                assumed = %warning.assumed,
                "Schema may contain different types"
            );
            self.warnings.push(warning);
        }

        match assumed {
            SchemaDefinition::Leaf(native_type) => {
                self.columns.push(ColumnSchema::new(column_name, native_type.as_str()));
            }
            nested => self.record(column_name, nested),
        }
    }

    /// Columns recorded so far.
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Ambiguities found so far.
    pub fn warnings(&self) -> &[SchemaWarning] {
        &self.warnings
    }

    /// Consume the recorder and return the columns.
    pub fn into_columns(self) -> Vec<ColumnSchema> {
        self.columns
    }
}

/// Flatten a single dynamic column.
pub fn record_schema(column_name: &str, schema: &SchemaDefinition) -> Vec<ColumnSchema> {
    let mut recorder = SchemaRecorder::new();
    recorder.record(column_name, schema);
    recorder.into_columns()
}

fn describe(schema: &SchemaDefinition) -> String {
    match schema {
        SchemaDefinition::Leaf(native_type) => native_type.clone(),
        SchemaDefinition::Array(_) => "array".to_string(),
        SchemaDefinition::Object(_) => "object".to_string(),
    }
}
