//! Services of the Logship data source core.
//!
//! - `cache` - TTL cache with in-flight de-duplication
//! - `mapper` - schema mapping lookups
//! - `resolver` - table and column resolution with dynamic expansion
//! - `datasource` - the data source instance and its query lifecycle
//! - `interpolate` - template variable substitution and quoting
//! - `macros` - KQL macro expansion
//! - `response` - backend response adapters
//! - `type_mapping` - native type normalization
//! - `suggest` - autocomplete ordering
//! - `backend` - the remote transport seam

pub mod backend;
pub mod cache;
pub mod datasource;
pub mod interpolate;
pub mod macros;
pub mod mapper;
pub mod resolver;
pub mod response;
pub mod suggest;
pub mod type_mapping;

pub use backend::Backend;
pub use cache::{CacheKey, CachePolicy, SharedFetch, TtlCache};
pub use datasource::{DataSource, DatabaseOption, RefreshedSchema};
pub use interpolate::{interpolate_variable, StaticTemplateSrv, TemplateSrv};
pub use macros::MacroContext;
pub use mapper::SchemaMapper;
pub use resolver::SchemaResolver;
pub use response::first_field_to_metric_find_value;
pub use suggest::sort_starts_with_values_first;
pub use type_mapping::to_property_type;
