//! Core of the Logship data source.
//!
//! Schema discovery and query preparation for the KQL editor:
//!
//! - **error**: Error handling with backend message extraction
//! - **models**: Schema, mapping, query, variable and settings types
//! - **services**: Caching, schema resolution, interpolation, adapters
//! - **state**: Registry of live data source instances
//! - **logging**: Structured logging setup

pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;


pub use error::{ErrorInfo, LogshipError, LogshipResult};
pub use models::{
    ColumnLookup, ColumnSchema, DataFrame, DataQueryRequest, DataSourceSettings, DatabaseSchema,
    InstanceSettings, KustoQuery, MetricFindValue, SchemaMapping, TableSchema, TemplateVariable,
};
pub use services::{Backend, DataSource, SchemaMapper, SchemaResolver, TemplateSrv};
pub use state::PluginState;
