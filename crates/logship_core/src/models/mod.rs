//! Data models for the Logship data source core.
//!
//! This module contains all core data structures:
//! - `schema` - DatabaseSchema, TableSchema, ColumnSchema, SchemaDefinition
//! - `mapping` - SchemaMapping and its partial, settings-side form
//! - `query` - KustoQuery, DataFrame, MetricFindValue
//! - `variable` - TemplateVariable, VariableValue
//! - `settings` - DataSourceSettings, InstanceSettings

pub mod mapping;
pub mod query;
pub mod schema;
pub mod settings;
pub mod variable;

pub use mapping::{PartialSchemaMapping, SchemaMapping, SchemaMappingOption, SchemaMappingType};
pub use query::{
    DataFrame, DataQueryRequest, Field, FieldType, KustoQuery, MetricFindValue, QuerySource,
    ResultFormat, TimeRange,
};
pub use schema::{
    ColumnLookup, ColumnSchema, DatabaseSchema, PropertyDefinition, PropertyType,
    SchemaDefinition, TableSchema, DEFAULT_DATABASE,
};
pub use settings::{DataSourceSettings, InstanceSettings};
pub use variable::{ScopedVars, TemplateVariable, VariableValue};
