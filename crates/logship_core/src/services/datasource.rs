//! Data source instance.
//!
//! A [`DataSource`] ties one configured Logship instance to its backend,
//! its template variables, its schema mapper and its private schema caches.
//! Query helpers mirror the lifecycle the host drives: filter, interpolate,
//! execute, adapt.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LogshipResult;
use crate::models::mapping::{SchemaMappingOption, SchemaMappingType};
use crate::models::query::{
    DataFrame, DataQueryRequest, KustoQuery, MetricFindValue, QuerySource, ResultFormat,
};
use crate::models::schema::{ColumnLookup, ColumnSchema, DatabaseSchema, DEFAULT_DATABASE};
use crate::models::settings::{DataSourceSettings, InstanceSettings};
use crate::models::variable::ScopedVars;
use crate::services::backend::Backend;
use crate::services::cache::{CacheKey, CachePolicy, TtlCache};
use crate::services::interpolate::{interpolate_variable, TemplateSrv};
use crate::services::macros::{interpolate_kusto_query, MacroContext};
use crate::services::mapper::SchemaMapper;
use crate::services::resolver::SchemaResolver;
use crate::services::response::{
    dynamic_schema_parser, first_field_to_metric_find_value, function_schema_parser,
    parse_schema_result,
};

/// Rows sampled when inferring the shape of dynamic columns or functions.
const SCHEMA_SAMPLE_ROWS: u32 = 50_000;

/// Resource path of the schema endpoint.
const SCHEMA_RESOURCE: &str = "schema";

/// Database option offered by the config editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseOption {
    /// Text shown in the picker
    pub label: String,
    /// Database name
    pub value: String,
}

/// Result of a schema refresh from the config editor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedSchema {
    /// Databases available for the instance
    pub databases: Vec<DatabaseOption>,
    /// Every table, offered as a mapping target
    pub schema_mapping_options: Vec<SchemaMappingOption>,
}

/// A configured Logship data source.
pub struct DataSource {
    id: Uuid,
    name: String,
    settings: DataSourceSettings,
    backend: Arc<dyn Backend>,
    template_srv: Arc<dyn TemplateSrv>,
    schema_mapper: SchemaMapper,
    schema_cache: TtlCache<CacheKey, Arc<DatabaseSchema>>,
    column_cache: TtlCache<CacheKey, ColumnLookup>,
}

impl DataSource {
    /// Create a data source from its instance settings.
    pub fn new(
        instance: InstanceSettings,
        backend: Arc<dyn Backend>,
        template_srv: Arc<dyn TemplateSrv>,
    ) -> Self {
        let settings = instance.json_data;
        let schema_mapper =
            SchemaMapper::new(settings.use_schema_mapping, &settings.schema_mappings);
        let policy = CachePolicy::from_settings(&settings);

        tracing::info!(
            datasource_id = %instance.id,
            name = %instance.name,
            schema_mapping = settings.use_schema_mapping,
            schema_cache_ttl = ?policy.ttl,
            "Data source created"
        );

        Self {
            id: instance.id,
            name: instance.name,
            settings,
            backend,
            template_srv,
            schema_mapper,
            schema_cache: TtlCache::new(policy),
            column_cache: TtlCache::new(policy),
        }
    }

    /// Get the instance identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the loaded settings.
    pub fn settings(&self) -> &DataSourceSettings {
        &self.settings
    }

    /// Get the schema mapper built from the settings.
    pub fn get_schema_mapper(&self) -> &SchemaMapper {
        &self.schema_mapper
    }

    /// Create a schema resolver over this instance.
    pub fn resolver(self: &Arc<Self>) -> SchemaResolver {
        SchemaResolver::new(Arc::clone(self))
    }

    pub(crate) fn column_cache(&self) -> &TtlCache<CacheKey, ColumnLookup> {
        &self.column_cache
    }

    /// Fetch the database schema, served from cache while it is live.
    ///
    /// The returned future does not borrow the data source.
    pub fn get_schema(&self, force_refresh: bool) -> BoxFuture<'static, LogshipResult<Arc<DatabaseSchema>>> {
        let backend = Arc::clone(&self.backend);
        let datasource_id = self.id;

        self.schema_cache
            .get_or_fetch(
                CacheKey::SchemaOverview { datasource_id },
                move || async move {
                    tracing::debug!(%datasource_id, "Fetching schema");
                    let payload = backend.get_resource(SCHEMA_RESOURCE).await?;
                    let schema = parse_schema_result(payload)?;
                    tracing::debug!(%datasource_id, tables = schema.tables.len(), "Schema fetched");
                    Ok(Arc::new(schema))
                },
                force_refresh,
            )
            .boxed()
    }

    /// Refetch the schema and list it for the config editor.
    pub async fn refresh_schema(&self) -> LogshipResult<RefreshedSchema> {
        let schema = self.get_schema(true).await?;

        let schema_mapping_options = schema
            .tables
            .iter()
            .map(|table| SchemaMappingOption {
                label: format!("{}/tables/{}", schema.name, table.name),
                value: table.name.clone(),
                mapping_type: SchemaMappingType::Table,
                name: table.name.clone(),
                database: schema.name.clone(),
            })
            .collect();

        Ok(RefreshedSchema {
            databases: vec![DatabaseOption { label: schema.name.clone(), value: schema.name.clone() }],
            schema_mapping_options,
        })
    }

    /// Infer the shape of `columns` in `table` and flatten them.
    ///
    /// Returns the expanded columns keyed by the dynamic column they belong
    /// to. No query is issued when `columns` is empty. The returned future
    /// does not borrow the data source.
    pub fn get_dynamic_schema(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
    ) -> BoxFuture<'static, LogshipResult<HashMap<String, Vec<ColumnSchema>>>> {
        if columns.is_empty() {
            return future::ready(Ok(HashMap::new())).boxed();
        }

        tracing::debug!(database, table, columns = ?columns, "Querying dynamic schema");
        let frames = self.run_schema_query(&dynamic_schema_query(table, columns), database);
        async move { Ok(dynamic_schema_parser(&frames.await?)) }.boxed()
    }

    /// Get the output columns of a stored function.
    pub async fn get_function_schema(
        &self,
        database: &str,
        function: &str,
    ) -> LogshipResult<Vec<ColumnSchema>> {
        tracing::debug!(database, function, "Querying function schema");
        let query = [function.to_string(), format!("take {SCHEMA_SAMPLE_ROWS}"), "getschema".to_string()]
            .join("\n | ");
        let frames = self.run_schema_query(&query, database).await?;
        Ok(function_schema_parser(&frames))
    }

    fn run_schema_query(&self, query: &str, database: &str) -> BoxFuture<'static, LogshipResult<Vec<DataFrame>>> {
        let mut target = self.build_query(query, &ScopedVars::new(), database);
        target.query_source = QuerySource::Schema;
        self.query(DataQueryRequest::single(target))
    }

    /// Check if a query should be executed.
    pub fn filter_query(&self, target: &KustoQuery) -> bool {
        !target.hide && !target.query.trim().is_empty()
    }

    /// The query a new panel starts with.
    pub fn default_query(&self) -> KustoQuery {
        KustoQuery::default_query()
    }

    /// Expand macros and variables in `query` without a time range.
    pub fn interpolate(&self, query: &str, scoped_vars: &ScopedVars) -> String {
        self.interpolate_with_context(query, scoped_vars, &MacroContext::default())
    }

    /// Expand macros and variables in `query`.
    pub fn interpolate_with_context(
        &self,
        query: &str,
        scoped_vars: &ScopedVars,
        context: &MacroContext,
    ) -> String {
        interpolate_kusto_query(
            query,
            |text| self.template_srv.replace(text, scoped_vars, &interpolate_variable),
            context,
        )
    }

    /// Build a table query for annotations, variables and schema lookups.
    pub fn build_query(&self, query: &str, scoped_vars: &ScopedVars, database: &str) -> KustoQuery {
        let interpolated = self.interpolate(query, scoped_vars);
        tracing::trace!(database, query = %interpolated, "Built query");

        KustoQuery {
            ref_id: format!("logship-{interpolated}"),
            result_format: ResultFormat::Table,
            query: interpolated,
            ..KustoQuery::default_query()
        }
    }

    /// Return `target` with its query text interpolated.
    pub fn apply_template_variables(
        &self,
        target: &KustoQuery,
        scoped_vars: &ScopedVars,
        context: &MacroContext,
    ) -> KustoQuery {
        KustoQuery {
            query: self.interpolate_with_context(&target.query, scoped_vars, context),
            ..target.clone()
        }
    }

    /// Run a request: drop skipped queries, interpolate the rest, execute.
    ///
    /// Queries are prepared before this returns; the returned future does
    /// not borrow the data source.
    pub fn query(&self, request: DataQueryRequest) -> BoxFuture<'static, LogshipResult<Vec<DataFrame>>> {
        let context = MacroContext::from_request(&request);
        let targets: Vec<KustoQuery> = request
            .targets
            .iter()
            .filter(|target| self.filter_query(target))
            .map(|target| self.apply_template_variables(target, &request.scoped_vars, &context))
            .collect();

        if targets.is_empty() {
            return future::ready(Ok(Vec::new())).boxed();
        }

        let backend = Arc::clone(&self.backend);
        let request = DataQueryRequest { targets, ..request };
        async move { backend.query(request).await }.boxed()
    }

    /// Run a variable query and list the first column as options.
    pub async fn metric_find_query(
        &self,
        query: &str,
        scoped_vars: &ScopedVars,
    ) -> LogshipResult<Vec<MetricFindValue>> {
        let mut target = self.build_query(query, scoped_vars, DEFAULT_DATABASE);
        target.query_source = QuerySource::Variable;

        let request = DataQueryRequest { scoped_vars: scoped_vars.clone(), ..DataQueryRequest::single(target) };
        let frames = self.query(request).await.inspect_err(|error| {
            tracing::warn!(datasource_id = %self.id, error = %error, "Variable query failed");
        })?;

        Ok(frames.first().map(first_field_to_metric_find_value).unwrap_or_default())
    }

    /// Variable references available to the editor, e.g. `$host`.
    pub fn get_variables(&self) -> Vec<String> {
        self.template_srv.variables().iter().map(|variable| format!("${}", variable.name)).collect()
    }
}

fn dynamic_schema_query(table: &str, columns: &[String]) -> String {
    let filters: Vec<String> = columns.iter().map(|column| format!("isnotnull({column})")).collect();
    let summaries: Vec<String> = columns.iter().map(|column| format!("buildschema({column})")).collect();

    [
        table.to_string(),
        format!("take {SCHEMA_SAMPLE_ROWS}"),
        format!("where {}", filters.join(" and ")),
        format!("project {}", columns.join(", ")),
        format!("summarize {}", summaries.join(", ")),
    ]
    .join("\n | ")
}
