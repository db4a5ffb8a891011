//! Backend trait definition.
//!
//! The [`Backend`] trait abstracts over the host's transport to the Logship
//! server: resource calls return raw JSON and queries return tabular frames.
//! Both reject with [`LogshipError::Backend`](crate::error::LogshipError)
//! carrying the server's message.
//!
//! # Example
//!
//! ```ignore
//! use logship_core::services::Backend;
//!
//! async fn example(backend: &dyn Backend) -> LogshipResult<()> {
//!     let payload = backend.get_resource("schema").await?;
//!     let frames = backend.query(DataQueryRequest::single(KustoQuery::new("logs | take 5"))).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LogshipResult;
use crate::models::query::{DataFrame, DataQueryRequest};

/// Remote calls a data source instance depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch a plugin resource, e.g. `"schema"`.
    async fn get_resource(&self, path: &str) -> LogshipResult<Value>;

    /// Execute queries and return their result frames.
    async fn query(&self, request: DataQueryRequest) -> LogshipResult<Vec<DataFrame>>;
}
