//! Data source settings.
//!
//! Settings arrive as the instance's JSON blob, written by the config editor.
//! [`DataSourceSettings::load`] validates them and derives the values the
//! rest of the crate works with.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LogshipError, LogshipResult};
use crate::models::mapping::PartialSchemaMapping;

/// Default server-side query timeout.
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest query timeout the server accepts.
const MAX_QUERY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default time-to-live for cached schema lookups (5 minutes).
const DEFAULT_SCHEMA_CACHE_TTL: Duration = Duration::from_secs(300);

/// Authentication used when none is configured.
const DEFAULT_AUTH_TYPE: &str = "jwt";

/// Settings of one data source instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSourceSettings {
    /// Base URL of the Logship cluster
    pub cluster_url: String,
    /// Database used when a query does not name one
    pub default_database: String,
    /// Server execution timeout as a duration string, e.g. "30s"
    pub query_timeout: String,
    /// Result cache max age forwarded to the server
    pub cache_max_age: String,
    /// Whether the server may pick the cache age per query
    pub dynamic_caching: bool,
    /// Whether schema mappings replace physical names in the editor
    pub use_schema_mapping: bool,
    /// Configured mappings; incomplete entries are ignored
    pub schema_mappings: Vec<PartialSchemaMapping>,
    /// Whether user tracking headers are sent
    pub enable_user_tracking: bool,
    /// Authentication scheme
    pub auth_type: String,
    /// User for password-based auth
    pub username: String,
    /// How long schema lookups stay cached, e.g. "5m"
    pub schema_cache_ttl: String,
    /// How long failed schema lookups stay cached, e.g. "0s"
    pub failed_fetch_ttl: String,

    /// Parsed `query_timeout`
    #[serde(skip)]
    pub query_timeout_value: Duration,
    /// `query_timeout` formatted as a server timespan
    #[serde(skip)]
    pub server_timeout_value: String,
    /// Parsed `schema_cache_ttl`
    #[serde(skip)]
    pub schema_cache_ttl_value: Duration,
    /// Parsed `failed_fetch_ttl`
    #[serde(skip)]
    pub failed_fetch_ttl_value: Duration,
}

impl DataSourceSettings {
    /// Parse and load settings from the instance JSON.
    pub fn from_json_str(json: &str) -> LogshipResult<Self> {
        let mut settings: Self = if json.trim().is_empty() {
            Self::default()
        } else {
            serde_json::from_str(json).map_err(|e| {
                LogshipError::config(format!("could not unmarshal DataSourceSettings json: {e}"))
            })?
        };
        settings.load()?;
        Ok(settings)
    }

    /// Parse and load settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> LogshipResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Normalize raw values and fill in derived fields.
    pub fn load(&mut self) -> LogshipResult<()> {
        self.cluster_url = self.cluster_url.trim_end_matches(['/', '\\']).to_string();

        self.query_timeout_value = if self.query_timeout.is_empty() {
            DEFAULT_QUERY_TIMEOUT
        } else {
            parse_duration(&self.query_timeout)?
        };

        if self.auth_type.is_empty() {
            self.auth_type = DEFAULT_AUTH_TYPE.to_string();
        }

        self.server_timeout_value = format_timeout(self.query_timeout_value)?;

        self.schema_cache_ttl_value = if self.schema_cache_ttl.is_empty() {
            DEFAULT_SCHEMA_CACHE_TTL
        } else {
            parse_duration(&self.schema_cache_ttl)?
        };

        self.failed_fetch_ttl_value = if self.failed_fetch_ttl.is_empty() {
            Duration::ZERO
        } else {
            parse_duration(&self.failed_fetch_ttl)?
        };

        Ok(())
    }
}

/// Identity and settings of a configured data source instance.
#[derive(Debug, Clone)]
pub struct InstanceSettings {
    /// Instance identifier, scoping every cache key of the instance
    pub id: Uuid,
    /// Name shown in the host
    pub name: String,
    /// Loaded settings
    pub json_data: DataSourceSettings,
}

impl InstanceSettings {
    /// Create instance settings with a fresh identifier.
    pub fn new(name: impl Into<String>, json_data: DataSourceSettings) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), json_data }
    }

    /// Create instance settings with a known identifier.
    pub fn with_id(id: Uuid, name: impl Into<String>, json_data: DataSourceSettings) -> Self {
        Self { id, name: name.into(), json_data }
    }
}

/// Parse a duration string such as `"30s"`, `"1m30s"`, `"1.5h"` or `"250ms"`.
///
/// Accepted units are `ns`, `us`/`µs`, `ms`, `s`, `m` and `h`. A bare `"0"`
/// is allowed.
pub fn parse_duration(input: &str) -> LogshipResult<Duration> {
    let invalid = || LogshipError::config(format!("invalid duration \"{input}\""));

    let text = input.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos: u128 = 0;
    let mut rest = text;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        let (whole, fraction) = match rest[..number_len].split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (&rest[..number_len], ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        rest = &rest[number_len..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let nanos_per_unit: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let parse = |digits: &str| -> LogshipResult<u128> {
            if digits.is_empty() {
                Ok(0)
            } else {
                digits.parse().map_err(|_| invalid())
            }
        };
        let mut nanos = parse(whole)?.checked_mul(nanos_per_unit).ok_or_else(invalid)?;
        if !fraction.is_empty() {
            let scale = 10u128.checked_pow(fraction.len() as u32).ok_or_else(invalid)?;
            let fraction_nanos = parse(fraction)?.checked_mul(nanos_per_unit).ok_or_else(invalid)? / scale;
            nanos = nanos.checked_add(fraction_nanos).ok_or_else(invalid)?;
        }
        total_nanos = total_nanos.checked_add(nanos).ok_or_else(invalid)?;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (total_nanos % 1_000_000_000) as u32))
}

/// Format a timeout as the server's timespan notation.
///
/// Only timeouts up to one hour are accepted.
pub fn format_timeout(timeout: Duration) -> LogshipResult<String> {
    if timeout > MAX_QUERY_TIMEOUT {
        return Err(LogshipError::config("timeout must be one hour or less"));
    }

    let secs = timeout.as_secs_f64().round() as u64;
    if secs >= MAX_QUERY_TIMEOUT.as_secs() {
        return Ok("01:00:00".to_string());
    }
    Ok(format!("00:{:02}:{:02}", secs / 60, secs % 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let settings = DataSourceSettings::from_json_str("{}").unwrap();
        assert_eq!(settings.query_timeout_value, Duration::from_secs(30));
        assert_eq!(settings.server_timeout_value, "00:00:30");
        assert_eq!(settings.auth_type, "jwt");
        assert_eq!(settings.schema_cache_ttl_value, Duration::from_secs(300));
        assert_eq!(settings.failed_fetch_ttl_value, Duration::ZERO);
        assert!(!settings.use_schema_mapping);
    }

    #[test]
    fn test_load_full_settings() {
        let settings = DataSourceSettings::from_json_str(
            r#"{
                "clusterUrl": "https://logship.example.com//",
                "queryTimeout": "1m30s",
                "useSchemaMapping": true,
                "schemaMappings": [
                    { "type": "table", "name": "t", "value": "T", "database": "Default", "displayName": "Tee" },
                    { "type": "table", "name": "broken" }
                ],
                "schemaCacheTtl": "10m",
                "failedFetchTtl": "5s",
                "authType": "oauth"
            }"#,
        )
        .unwrap();
        assert_eq!(settings.cluster_url, "https://logship.example.com");
        assert_eq!(settings.server_timeout_value, "00:01:30");
        assert_eq!(settings.schema_mappings.len(), 2);
        assert_eq!(settings.schema_cache_ttl_value, Duration::from_secs(600));
        assert_eq!(settings.failed_fetch_ttl_value, Duration::from_secs(5));
        assert_eq!(settings.auth_type, "oauth");
    }

    #[test]
    fn test_load_rejects_long_timeout() {
        let err = DataSourceSettings::from_json_str(r#"{ "queryTimeout": "2h" }"#).unwrap_err();
        assert_eq!(err.category(), "Config");
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        assert!(DataSourceSettings::from_json_str("{ not json").is_err());
        assert!(DataSourceSettings::from_json_str("").is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "defaultDatabase": "Default", "queryTimeout": "45s" }}"#).unwrap();

        let settings = DataSourceSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.default_database, "Default");
        assert_eq!(settings.server_timeout_value, "00:00:45");
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataSourceSettings::from_file(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.category(), "Config");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5 minutes").is_err());
        assert!(parse_duration("m5").is_err());
    }

    #[test]
    fn test_parse_duration_overflow_is_config_error() {
        let err = parse_duration("99999999999999999999999999999999h").unwrap_err();
        assert_eq!(err.category(), "Config");
        assert!(parse_duration("1.99999999999999999999999999999999999999h").is_err());

        let huge = format!(r#"{{ "schemaCacheTtl": "{}h" }}"#, "9".repeat(32));
        assert_eq!(DataSourceSettings::from_json_str(&huge).unwrap_err().category(), "Config");
    }

    #[test]
    fn test_format_timeout() {
        assert_eq!(format_timeout(Duration::from_secs(9)).unwrap(), "00:00:09");
        assert_eq!(format_timeout(Duration::from_secs(600)).unwrap(), "00:10:00");
        assert_eq!(format_timeout(Duration::from_secs(3600)).unwrap(), "01:00:00");
        assert!(format_timeout(Duration::from_secs(3601)).is_err());
    }

    #[test]
    fn test_format_timeout_rounds_up_to_one_hour() {
        let almost_an_hour = parse_duration("59m59.6s").unwrap();
        assert_eq!(format_timeout(almost_an_hour).unwrap(), "01:00:00");
        assert_eq!(format_timeout(parse_duration("59m59.4s").unwrap()).unwrap(), "00:59:59");
    }
}
