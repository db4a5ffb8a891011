//! Query and result models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::variable::ScopedVars;

/// How results of a query should be shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultFormat {
    /// Plain table
    #[default]
    Table,
    /// Time series built by the plugin
    TimeSeries,
    /// Time series produced natively by the engine (`make-series`)
    #[serde(rename = "time_series_adx")]
    TimeSeriesNative,
}

/// Which part of the plugin issued a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    /// Typed by the user
    #[default]
    Raw,
    /// Schema introspection
    Schema,
    /// Editor autocompletion
    Autocomplete,
    /// Template variable population
    Variable,
}

/// A KQL query as edited in a dashboard panel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KustoQuery {
    /// Panel-local query identifier
    #[serde(default)]
    pub ref_id: String,
    /// Raw KQL text
    #[serde(default)]
    pub query: String,
    /// Requested result shape
    #[serde(default)]
    pub result_format: ResultFormat,
    /// Origin of the query
    #[serde(default)]
    pub query_source: QuerySource,
    /// Plugin version that produced the query
    #[serde(default)]
    pub plugin_version: String,
    /// Hidden queries are not executed
    #[serde(default)]
    pub hide: bool,
}

impl KustoQuery {
    /// Create a raw table query.
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default_query() }
    }

    /// The query a freshly added panel starts with.
    pub fn default_query() -> Self {
        Self {
            ref_id: String::new(),
            query: String::new(),
            result_format: ResultFormat::Table,
            query_source: QuerySource::Raw,
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
            hide: false,
        }
    }
}

/// Dashboard time range used by the time macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range
    pub from: DateTime<Utc>,
    /// End of the range
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Create a new time range.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Length of the range.
    pub fn span(&self) -> Duration {
        self.to - self.from
    }
}

/// A batch of queries sent to the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQueryRequest {
    /// Queries to run
    pub targets: Vec<KustoQuery>,
    /// Dashboard time range, if any
    #[serde(default)]
    pub range: Option<TimeRange>,
    /// Suggested bucket width in milliseconds
    #[serde(default)]
    pub interval_ms: Option<u64>,
    /// Variables scoped to the requesting panel
    #[serde(default)]
    pub scoped_vars: ScopedVars,
}

impl DataQueryRequest {
    /// Request running a single query.
    pub fn single(query: KustoQuery) -> Self {
        Self { targets: vec![query], ..Self::default() }
    }
}

/// Value type of a result field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Numbers
    Number,
    /// Timestamps
    Time,
    /// Strings and anything unclassified
    #[default]
    String,
    /// Booleans
    Boolean,
    /// Nested JSON payloads
    Other,
}

/// One column of a tabular result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Column name
    pub name: String,
    /// Column value type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Row values
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Field {
    /// Create a field from its values.
    pub fn new(name: impl Into<String>, field_type: FieldType, values: Vec<Value>) -> Self {
        Self { name: name.into(), field_type, values }
    }
}

/// A tabular result returned by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFrame {
    /// Frame name, usually the query refId
    #[serde(default)]
    pub name: Option<String>,
    /// Columns in result order
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl DataFrame {
    /// Create a frame from its fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { name: None, fields }
    }

    /// Number of rows, taken from the longest field.
    pub fn len(&self) -> usize {
        self.fields.iter().map(|field| field.values.len()).max().unwrap_or(0)
    }

    /// Check if the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the field with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// Entry in a template variable's option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricFindValue {
    /// Option text
    pub text: String,
}

impl MetricFindValue {
    /// Create a new value.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_serde_names() {
        let query: KustoQuery = serde_json::from_value(json!({
            "refId": "A",
            "query": "logs | take 10",
            "resultFormat": "time_series_adx",
            "querySource": "autocomplete"
        }))
        .unwrap();
        assert_eq!(query.result_format, ResultFormat::TimeSeriesNative);
        assert_eq!(query.query_source, QuerySource::Autocomplete);
        assert!(!query.hide);
    }

    #[test]
    fn test_default_query() {
        let query = KustoQuery::default_query();
        assert_eq!(query.query, "");
        assert_eq!(query.query_source, QuerySource::Raw);
        assert_eq!(query.plugin_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_frame_len_uses_longest_field() {
        let frame = DataFrame::new(vec![
            Field::new("a", FieldType::String, vec![json!("x")]),
            Field::new("b", FieldType::Number, vec![json!(1), json!(2)]),
        ]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.field_index("b"), Some(1));
        assert!(DataFrame::default().is_empty());
    }
}
