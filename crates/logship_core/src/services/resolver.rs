//! Schema resolution for the query editor.
//!
//! Resolves tables and their columns through the instance's schema mapper,
//! expanding `dynamic` columns into their sub-field accessor paths.

use std::sync::{Arc, Weak};

use crate::error::{LogshipError, LogshipResult};
use crate::models::schema::{ColumnLookup, ColumnSchema, DatabaseSchema, TableSchema, DEFAULT_DATABASE};
use crate::services::cache::CacheKey;
use crate::services::datasource::DataSource;

/// Resolves schema information for one data source instance.
///
/// Cheap to create; resolved columns are cached on the data source, so
/// every resolver over the same instance shares them.
#[derive(Clone)]
pub struct SchemaResolver {
    datasource: Arc<DataSource>,
}

impl SchemaResolver {
    /// Create a resolver over `datasource`.
    pub fn new(datasource: Arc<DataSource>) -> Self {
        Self { datasource }
    }

    /// Get the cached schema of the instance's database.
    pub async fn get_databases(&self) -> LogshipResult<Arc<DatabaseSchema>> {
        self.datasource.get_schema(false).await
    }

    /// List the tables of the instance's database.
    pub async fn get_tables_for_database(&self) -> LogshipResult<Vec<TableSchema>> {
        Ok(self.get_databases().await?.tables.clone())
    }

    /// Resolve the columns of `table_name`.
    ///
    /// The name may be a mapped value; it is translated to the physical
    /// table first. Dynamic columns are replaced in place by their expanded
    /// sub-columns. An unknown table yields [`ColumnLookup::Empty`].
    pub async fn get_columns_for_table(&self, table_name: &str) -> LogshipResult<ColumnLookup> {
        let key = CacheKey::TableColumns {
            datasource_id: self.datasource.id(),
            database: DEFAULT_DATABASE.to_string(),
            table: table_name.to_string(),
        };
        // The fetch is stored in the instance's own cache, so it must not
        // keep the instance alive.
        let datasource = Arc::downgrade(&self.datasource);
        let table_name = table_name.to_string();

        self.datasource
            .column_cache()
            .get_or_fetch(key, move || resolve_columns(datasource, table_name), false)
            .await
    }
}

fn upgrade(datasource: &Weak<DataSource>) -> LogshipResult<Arc<DataSource>> {
    datasource.upgrade().ok_or_else(|| LogshipError::internal("data source was removed"))
}

async fn resolve_columns(datasource: Weak<DataSource>, table_name: String) -> LogshipResult<ColumnLookup> {
    let (schema, physical_name) = {
        let instance = upgrade(&datasource)?;
        let physical_name = instance.get_schema_mapper().physical_name(&table_name).to_string();
        (instance.get_schema(false), physical_name)
    };

    let schema = schema.await?;
    let Some(table) = schema.table(&physical_name) else {
        tracing::debug!(table = %table_name, physical_name = %physical_name, "Table not found in schema");
        return Ok(ColumnLookup::Empty);
    };

    let dynamic_columns: Vec<String> = table
        .columns
        .iter()
        .filter(|column| column.is_dynamic())
        .map(|column| column.name.clone())
        .collect();

    let expanded = upgrade(&datasource)?.get_dynamic_schema(DEFAULT_DATABASE, &physical_name, &dynamic_columns);
    let expanded = expanded.await?;

    let columns: Vec<ColumnSchema> = table
        .columns
        .iter()
        .flat_map(|column| match expanded.get(&column.name) {
            Some(sub_columns) => sub_columns.clone(),
            None => vec![column.clone()],
        })
        .collect();

    Ok(ColumnLookup::Found(columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogshipError;
    use crate::models::query::{DataFrame, DataQueryRequest, Field, FieldType};
    use crate::models::settings::{DataSourceSettings, InstanceSettings};
    use crate::services::backend::Backend;
    use crate::services::interpolate::StaticTemplateSrv;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SchemaBackend {
        schema: Value,
        dynamic_frames: Vec<DataFrame>,
        schema_calls: AtomicUsize,
        query_calls: AtomicUsize,
    }

    impl SchemaBackend {
        fn new(schema: Value, dynamic_frames: Vec<DataFrame>) -> Arc<Self> {
            Arc::new(Self {
                schema,
                dynamic_frames,
                schema_calls: AtomicUsize::new(0),
                query_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Backend for SchemaBackend {
        async fn get_resource(&self, path: &str) -> LogshipResult<Value> {
            assert_eq!(path, "schema");
            self.schema_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.schema.clone())
        }

        async fn query(&self, _request: DataQueryRequest) -> LogshipResult<Vec<DataFrame>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.dynamic_frames.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl Backend for FailingBackend {
        async fn get_resource(&self, _path: &str) -> LogshipResult<Value> {
            Err(LogshipError::backend("Unauthorized"))
        }

        async fn query(&self, _request: DataQueryRequest) -> LogshipResult<Vec<DataFrame>> {
            Err(LogshipError::backend("Unauthorized"))
        }
    }

    fn schema_payload() -> Value {
        json!({
            "name": "Default",
            "tables": [{
                "name": "raw_requests",
                "columns": [
                    { "name": "timestamp", "type": "datetime" },
                    { "name": "props", "type": "dynamic" },
                    { "name": "status", "type": "int" }
                ]
            }]
        })
    }

    fn props_frames() -> Vec<DataFrame> {
        vec![DataFrame::new(vec![Field::new(
            "schema_props",
            FieldType::String,
            vec![json!(r#"{"path":"string","latency":["long","double"]}"#)],
        )])]
    }

    fn resolver(backend: Arc<dyn Backend>, settings_json: &str) -> SchemaResolver {
        let settings = DataSourceSettings::from_json_str(settings_json).unwrap();
        let datasource = Arc::new(DataSource::new(
            InstanceSettings::new("logship", settings),
            backend,
            Arc::new(StaticTemplateSrv::default()),
        ));
        datasource.resolver()
    }

    #[tokio::test]
    async fn test_dynamic_columns_expand_in_place() {
        let backend = SchemaBackend::new(schema_payload(), props_frames());
        let resolver = resolver(backend, "{}");

        let lookup = resolver.get_columns_for_table("raw_requests").await.unwrap();
        assert_eq!(
            lookup,
            ColumnLookup::Found(vec![
                ColumnSchema::new("timestamp", "datetime"),
                ColumnSchema::new("props[\"latency\"]", "double"),
                ColumnSchema::new("props[\"path\"]", "string"),
                ColumnSchema::new("status", "int"),
            ])
        );
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty_not_error() {
        let backend = SchemaBackend::new(schema_payload(), Vec::new());
        let resolver = resolver(backend.clone(), "{}");

        let lookup = resolver.get_columns_for_table("missing").await.unwrap();
        assert_eq!(lookup, ColumnLookup::Empty);
        assert!(lookup.columns().is_empty());
        assert_eq!(backend.query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mapped_value_resolves_physical_table() {
        let backend = SchemaBackend::new(schema_payload(), props_frames());
        let settings = r#"{
            "useSchemaMapping": true,
            "schemaMappings": [{
                "type": "table", "name": "raw_requests", "value": "Requests",
                "database": "Default", "displayName": "HTTP requests"
            }]
        }"#;
        let resolver = resolver(backend, settings);

        let lookup = resolver.get_columns_for_table("Requests").await.unwrap();
        assert!(lookup.is_found());
        assert_eq!(lookup.columns().len(), 4);
    }

    #[tokio::test]
    async fn test_columns_are_cached_per_table() {
        let backend = SchemaBackend::new(schema_payload(), props_frames());
        let resolver = resolver(backend.clone(), "{}");

        let (a, b) = tokio::join!(
            resolver.get_columns_for_table("raw_requests"),
            resolver.get_columns_for_table("raw_requests"),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        resolver.get_columns_for_table("raw_requests").await.unwrap();

        assert_eq!(backend.schema_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.query_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tables_for_database() {
        let backend = SchemaBackend::new(schema_payload(), Vec::new());
        let resolver = resolver(backend, "{}");

        let tables = resolver.get_tables_for_database().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "raw_requests");
        assert_eq!(resolver.get_databases().await.unwrap().name, "Default");
    }

    #[tokio::test]
    async fn test_fetch_failures_propagate() {
        let resolver = resolver(Arc::new(FailingBackend), "{}");

        let err = resolver.get_columns_for_table("raw_requests").await.unwrap_err();
        assert!(err.is_backend());
        assert_eq!(err.to_string(), "Unauthorized");
    }
}
