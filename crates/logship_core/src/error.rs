//! Error types for the Logship data source core.
//!
//! Remote failures travel through the schema cache to the UI boundary, where
//! they are turned into dismissable alerts via [`LogshipError::to_error_info`].

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Shared error source. Held behind an `Arc` so a single failure can be
/// handed to every caller awaiting the same cached fetch.
pub type ErrorSource = Arc<dyn std::error::Error + Send + Sync>;

/// Result alias used across the crate.
pub type LogshipResult<T> = Result<T, LogshipError>;

/// Main error type for the data source core.
#[derive(Debug, Clone, Error)]
pub enum LogshipError {
    /// A query or resource call to the backend failed.
    #[error("{message}")]
    Backend {
        /// Human-readable error message.
        message: String,
        /// HTTP status reported by the backend, if any.
        status: Option<u16>,
        /// Raw error payload returned by the backend.
        body: Option<Value>,
    },

    /// The backend returned a schema payload that could not be interpreted.
    #[error("Schema error: {message}")]
    Schema {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<ErrorSource>,
    },

    /// Data source settings are invalid.
    #[error("Config error: {message}")]
    Config {
        /// Human-readable error message.
        message: String,
    },

    /// Unexpected internal error.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<ErrorSource>,
    },
}

impl LogshipError {
    // ========== Constructors ==========

    /// Create a backend error from a plain message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), status: None, body: None }
    }

    /// Create a backend error from a structured error payload.
    ///
    /// The message is taken from the payload when one can be found, otherwise
    /// `fallback` is used.
    pub fn backend_with_body(fallback: impl Into<String>, status: Option<u16>, body: Value) -> Self {
        let message = extract_error_message(&body).unwrap_or_else(|| fallback.into());
        Self::Backend { message, status, body: Some(body) }
    }

    /// Create a new schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema { message: message.into(), source: None }
    }

    /// Create a new schema error with source.
    pub fn schema_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Schema { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Create a new config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    // ========== Methods ==========

    /// Check if this error came from the remote backend.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Backend { .. } => "Backend",
            Self::Schema { .. } => "Schema",
            Self::Config { .. } => "Config",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Backend { status: Some(401 | 403), .. } => {
                Some("Check the data source credentials")
            }
            Self::Backend { .. } => Some("Check that the Logship cluster is reachable"),
            Self::Schema { .. } => Some("Try refreshing the schema"),
            Self::Config { .. } => Some("Review the data source settings"),
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Convert to the payload shown in a dismissable alert.
    pub fn to_error_info(&self) -> ErrorInfo {
        let technical_detail = match self {
            Self::Backend { status, body, .. } => {
                let mut parts = Vec::new();
                if let Some(status) = status {
                    parts.push(format!("Status: {status}"));
                }
                if let Some(body) = body {
                    parts.push(format!("Body: {body}"));
                }
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            }
            _ => None,
        };

        ErrorInfo {
            error_type: format!("{} Error", self.category()),
            message: self.to_string(),
            hint: self.hint().map(String::from),
            technical_detail,
        }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Category name (e.g., "Backend Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Technical detail for a "Show Details" expansion.
    pub technical_detail: Option<String>,
}

/// Paths probed, in order, for a human-readable message in an error payload.
const MESSAGE_PATHS: &[&[&str]] = &[
    &["data", "error", "message"],
    &["data", "message"],
    &["error", "message"],
    &["message"],
];

/// Best-effort lookup of a human-readable message inside an error payload.
///
/// Returns the first non-empty string found at one of the known paths.
pub fn extract_error_message(body: &Value) -> Option<String> {
    MESSAGE_PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(body, |value, key| value.get(key))
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map(String::from)
    })
}

// ========== Error Conversions ==========

/// Convert from serde_json::Error to LogshipError.
impl From<serde_json::Error> for LogshipError {
    fn from(err: serde_json::Error) -> Self {
        LogshipError::Schema { message: format!("JSON error: {err}"), source: Some(Arc::new(err)) }
    }
}

/// Convert from std::io::Error to LogshipError.
impl From<std::io::Error> for LogshipError {
    fn from(err: std::io::Error) -> Self {
        LogshipError::Config { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_message_prefers_nested_paths() {
        let body = json!({
            "message": "outer",
            "data": { "error": { "message": "Semantic error: table not found" } }
        });
        assert_eq!(
            extract_error_message(&body).as_deref(),
            Some("Semantic error: table not found")
        );
    }

    #[test]
    fn test_extract_message_skips_blank_values() {
        let body = json!({ "data": { "message": "  " }, "error": { "message": "boom" } });
        assert_eq!(extract_error_message(&body).as_deref(), Some("boom"));
    }

    #[test]
    fn test_extract_message_missing() {
        assert_eq!(extract_error_message(&json!({ "status": 500 })), None);
        assert_eq!(extract_error_message(&json!("plain text")), None);
    }

    #[test]
    fn test_backend_with_body_falls_back_to_stringified_error() {
        let err = LogshipError::backend_with_body("500 Internal Server Error", Some(500), json!({}));
        assert_eq!(err.to_string(), "500 Internal Server Error");

        let info = err.to_error_info();
        assert_eq!(info.error_type, "Backend Error");
        assert_eq!(info.technical_detail.as_deref(), Some("Status: 500\nBody: {}"));
    }

    #[test]
    fn test_auth_status_hint() {
        let err = LogshipError::backend_with_body("denied", Some(401), json!({ "message": "no" }));
        assert_eq!(err.hint(), Some("Check the data source credentials"));
        assert_eq!(err.to_string(), "no");
    }

    #[test]
    fn test_errors_are_cloneable_with_source() {
        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        let err = LogshipError::from(json_err);
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
        assert!(std::error::Error::source(&cloned).is_some());
        assert_eq!(cloned.category(), "Schema");
    }
}
