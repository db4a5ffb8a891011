//! Adapters from backend responses to core models.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{LogshipError, LogshipResult};
use crate::models::query::{DataFrame, MetricFindValue};
use crate::models::schema::{ColumnSchema, DatabaseSchema, SchemaDefinition, TableSchema};
use crate::services::type_mapping::record_schema;

/// Prefix of the fields returned by a `buildschema()` summary.
pub const DYNAMIC_SCHEMA_PREFIX: &str = "schema_";

/// Turn the first field of `frame` into variable options, one per row.
pub fn first_field_to_metric_find_value(frame: &DataFrame) -> Vec<MetricFindValue> {
    frame
        .fields
        .first()
        .map(|field| {
            field
                .values
                .iter()
                .map(|value| MetricFindValue::new(value_to_text(value)))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse the `schema` resource payload.
///
/// Accepts both the backend's PascalCase and camelCase keys, and a table
/// collection given either as a list or as an object keyed by table name.
pub fn parse_schema_result(payload: Value) -> LogshipResult<DatabaseSchema> {
    let Value::Object(mut root) = payload else {
        return Err(LogshipError::schema("schema response is not an object"));
    };

    let name = take_field(&mut root, &["Name", "name"])
        .and_then(|value| value.as_str().map(String::from))
        .unwrap_or_default();

    let tables = match take_field(&mut root, &["Tables", "tables"]) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(tables)) => tables
            .into_iter()
            .map(serde_json::from_value::<TableSchema>)
            .collect::<Result<_, _>>()?,
        Some(Value::Object(tables)) => tables
            .into_iter()
            .map(|(_, table)| serde_json::from_value::<TableSchema>(table))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(LogshipError::schema("schema tables must be a list or an object")),
    };

    Ok(DatabaseSchema { name, tables })
}

fn take_field(object: &mut serde_json::Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|key| object.remove(*key))
}

/// Parse `getschema` output into columns.
///
/// Rows of every frame are read from the `Name` and `Type` columns located
/// in the first frame. A result without those columns yields nothing.
pub fn function_schema_parser(frames: &[DataFrame]) -> Vec<ColumnSchema> {
    let Some(first) = frames.first() else {
        return Vec::new();
    };
    let (Some(name_index), Some(type_index)) = (first.field_index("Name"), first.field_index("Type")) else {
        return Vec::new();
    };

    let mut columns = Vec::new();
    for frame in frames {
        let (Some(names), Some(types)) = (frame.fields.get(name_index), frame.fields.get(type_index)) else {
            continue;
        };
        for (name, column_type) in names.values.iter().zip(&types.values) {
            columns.push(ColumnSchema::new(value_to_text(name), value_to_text(column_type)));
        }
    }
    columns
}

/// Parse `buildschema()` output into expanded columns keyed by the dynamic
/// column they came from.
///
/// Each `schema_<column>` field holds the column's shape in its first row,
/// either as a JSON string or as an already decoded object.
pub fn dynamic_schema_parser(frames: &[DataFrame]) -> HashMap<String, Vec<ColumnSchema>> {
    let mut result = HashMap::new();

    for field in frames.iter().flat_map(|frame| &frame.fields) {
        let Some(column) = field.name.strip_prefix(DYNAMIC_SCHEMA_PREFIX) else {
            continue;
        };

        let definition = match field.values.first() {
            Some(Value::String(json)) => match serde_json::from_str::<Value>(json) {
                Ok(value) => SchemaDefinition::from_json(&value),
                Err(error) => {
                    tracing::warn!(column, error = %error, "Could not parse dynamic schema");
                    None
                }
            },
            Some(value) => SchemaDefinition::from_json(value),
            None => None,
        };

        match definition {
            Some(definition) => {
                result.insert(column.to_string(), record_schema(column, &definition));
            }
            None => tracing::warn!(column, "Dynamic schema is empty, skipping column"),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::query::{Field, FieldType};
    use serde_json::json;

    #[test]
    fn test_metric_find_uses_first_field_in_row_order() {
        let frame = DataFrame::new(vec![
            Field::new("host", FieldType::String, vec![json!("web-1"), json!("web-2"), json!(null)]),
            Field::new("count", FieldType::Number, vec![json!(3), json!(4), json!(5)]),
        ]);

        assert_eq!(
            first_field_to_metric_find_value(&frame),
            vec![MetricFindValue::new("web-1"), MetricFindValue::new("web-2"), MetricFindValue::new("")]
        );
    }

    #[test]
    fn test_metric_find_formats_numbers() {
        let frame = DataFrame::new(vec![Field::new("n", FieldType::Number, vec![json!(1), json!(2.5)])]);
        let texts: Vec<_> = first_field_to_metric_find_value(&frame).into_iter().map(|v| v.text).collect();
        assert_eq!(texts, ["1", "2.5"]);
    }

    #[test]
    fn test_metric_find_without_fields_is_empty() {
        assert!(first_field_to_metric_find_value(&DataFrame::default()).is_empty());
    }

    #[test]
    fn test_parse_schema_result_pascal_case_map() {
        let schema = parse_schema_result(json!({
            "Name": "Default",
            "Tables": {
                "logs": { "Name": "logs", "OrderedColumns": [{ "Name": "msg", "Type": "string" }] }
            }
        }))
        .unwrap();

        assert_eq!(schema.name, "Default");
        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables[0].columns, vec![ColumnSchema::new("msg", "string")]);
    }

    #[test]
    fn test_parse_schema_result_camel_case_list() {
        let schema = parse_schema_result(json!({
            "name": "Default",
            "tables": [{ "name": "metrics", "columns": [{ "name": "value", "type": "real" }] }]
        }))
        .unwrap();

        assert!(schema.has_table("metrics"));
    }

    #[test]
    fn test_parse_schema_result_rejects_bad_payloads() {
        assert_eq!(parse_schema_result(json!([])).unwrap_err().category(), "Schema");
        assert_eq!(
            parse_schema_result(json!({ "name": "x", "tables": 5 })).unwrap_err().category(),
            "Schema"
        );
        assert!(parse_schema_result(json!({ "name": "x" })).unwrap().tables.is_empty());
    }

    #[test]
    fn test_function_schema_parser() {
        let frames = vec![
            DataFrame::new(vec![
                Field::new("Name", FieldType::String, vec![json!("ts"), json!("msg")]),
                Field::new("Type", FieldType::String, vec![json!("datetime"), json!("string")]),
            ]),
            DataFrame::new(vec![
                Field::new("Name", FieldType::String, vec![json!("n")]),
                Field::new("Type", FieldType::String, vec![json!("long")]),
            ]),
        ];

        assert_eq!(
            function_schema_parser(&frames),
            vec![
                ColumnSchema::new("ts", "datetime"),
                ColumnSchema::new("msg", "string"),
                ColumnSchema::new("n", "long"),
            ]
        );
    }

    #[test]
    fn test_function_schema_parser_without_columns() {
        let frames = vec![DataFrame::new(vec![Field::new("Name", FieldType::String, vec![json!("x")])])];
        assert!(function_schema_parser(&frames).is_empty());
        assert!(function_schema_parser(&[]).is_empty());
    }

    #[test]
    fn test_dynamic_schema_parser() {
        let frames = vec![DataFrame::new(vec![
            Field::new("schema_props", FieldType::String, vec![json!(r#"{"a":"long","b":{"c":"string"}}"#)]),
            Field::new("schema_tags", FieldType::Other, vec![json!({ "env": "string" })]),
            Field::new("schema_broken", FieldType::String, vec![json!("{not json")]),
            Field::new("schema_none", FieldType::Other, vec![json!(null)]),
            Field::new("other", FieldType::String, vec![json!("ignored")]),
        ])];

        let result = dynamic_schema_parser(&frames);
        assert_eq!(result.len(), 2);
        assert_eq!(
            result["props"],
            vec![
                ColumnSchema::new("props[\"a\"]", "long"),
                ColumnSchema::new("props[\"b\"][\"c\"]", "string"),
            ]
        );
        assert_eq!(result["tags"], vec![ColumnSchema::new("tags[\"env\"]", "string")]);
    }
}
