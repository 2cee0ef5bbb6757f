//! Table Configuration Settings
//!
//! Configuration types for the stock table service, loaded from environment
//! variables.

use std::time::Duration;

use reqwest::Url;

use crate::domain::sort::{Column, SortDescriptor, SortDirection};

/// Default backend base URL for both sources.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

/// Default Socket.IO event carrying replacement sets.
pub const DEFAULT_UPDATE_EVENT: &str = "findAllStocks";

/// Endpoints of the stock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Base URL of the REST API; the snapshot is `GET {api_url}/stocks`.
    pub api_url: Url,
    /// Base URL of the Socket.IO server.
    pub socket_url: Url,
    /// Socket.IO event carrying replacement sets.
    pub update_event: String,
    /// Timeout for the snapshot request.
    pub request_timeout: Duration,
    /// Timeout for opening the update channel.
    pub connect_timeout: Duration,
}

impl Default for SourceSettings {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        let backend = Url::parse(DEFAULT_BACKEND_URL).expect("default backend URL is valid");
        Self {
            api_url: backend.clone(),
            socket_url: backend,
            update_event: DEFAULT_UPDATE_EVENT.to_string(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Port of the table API, health and metrics endpoints.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Column sorted descending at startup.
    pub default_sort: Column,
    /// Capacity of the in-order dataset channel.
    pub dataset_capacity: usize,
}

impl PipelineSettings {
    /// Descriptor applied at startup.
    #[must_use]
    pub const fn default_descriptor(&self) -> SortDescriptor {
        SortDescriptor::new(self.default_sort, SortDirection::Descending)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_sort: Column::Symbol,
            dataset_capacity: 64,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableConfig {
    /// Backend endpoints.
    pub sources: SourceSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Pipeline settings.
    pub pipeline: PipelineSettings,
}

impl TableConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is invalid or the default sort column is
    /// unknown.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from a variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`TableConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let sources = SourceSettings {
            api_url: parse_url(&lookup, "STOCK_API_URL", defaults.sources.api_url)?,
            socket_url: parse_url(&lookup, "STOCK_SOCKET_URL", defaults.sources.socket_url)?,
            update_event: match lookup("STOCK_UPDATE_EVENT") {
                Some(event) if event.is_empty() => {
                    return Err(ConfigError::EmptyValue("STOCK_UPDATE_EVENT".to_string()));
                }
                Some(event) => event,
                None => defaults.sources.update_event,
            },
            request_timeout: parse_duration_secs(
                &lookup,
                "STOCK_TABLE_REQUEST_TIMEOUT_SECS",
                defaults.sources.request_timeout,
            ),
            connect_timeout: parse_duration_secs(
                &lookup,
                "STOCK_TABLE_CONNECT_TIMEOUT_SECS",
                defaults.sources.connect_timeout,
            ),
        };

        let server = ServerSettings {
            http_port: parse_or(&lookup, "STOCK_TABLE_HTTP_PORT", defaults.server.http_port),
        };

        let default_sort = match lookup("STOCK_TABLE_DEFAULT_SORT") {
            Some(key) => Column::from_key(&key).ok_or(ConfigError::UnknownColumn(key))?,
            None => defaults.pipeline.default_sort,
        };

        let pipeline = PipelineSettings {
            default_sort,
            dataset_capacity: parse_or(
                &lookup,
                "STOCK_TABLE_DATASET_CAPACITY",
                defaults.pipeline.dataset_capacity,
            ),
        };

        Ok(Self {
            sources,
            server,
            pipeline,
        })
    }

    /// Snapshot endpoint URL.
    #[must_use]
    pub fn snapshot_url(&self) -> String {
        format!("{}/stocks", self.sources.api_url.as_str().trim_end_matches('/'))
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A URL variable could not be parsed.
    #[error("invalid URL in {key}: {value}")]
    InvalidUrl {
        /// Variable name.
        key: String,
        /// Offending value.
        value: String,
    },
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// The default sort column is not a table column.
    #[error("unknown sort column: {0}")]
    UnknownColumn(String),
}

fn parse_url(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Url,
) -> Result<Url, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    Url::parse(&value).map_err(|_| ConfigError::InvalidUrl {
        key: key.to_string(),
        value,
    })
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = TableConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TableConfig::default());
        assert_eq!(config.sources.api_url.as_str(), "http://localhost:3000/");
        assert_eq!(config.sources.update_event, "findAllStocks");
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.pipeline.default_sort, Column::Symbol);
        assert_eq!(
            config.pipeline.default_descriptor(),
            SortDescriptor::DEFAULT
        );
    }

    #[test]
    fn overrides_from_lookup() {
        let config = TableConfig::from_lookup(lookup(&[
            ("STOCK_API_URL", "https://api.example.com/v1/"),
            ("STOCK_SOCKET_URL", "wss://push.example.com"),
            ("STOCK_UPDATE_EVENT", "stocks"),
            ("STOCK_TABLE_HTTP_PORT", "9000"),
            ("STOCK_TABLE_REQUEST_TIMEOUT_SECS", "3"),
            ("STOCK_TABLE_DEFAULT_SORT", "changePercent"),
            ("STOCK_TABLE_DATASET_CAPACITY", "8"),
        ]))
        .unwrap();

        assert_eq!(config.snapshot_url(), "https://api.example.com/v1/stocks");
        assert_eq!(config.sources.socket_url.scheme(), "wss");
        assert_eq!(config.sources.update_event, "stocks");
        assert_eq!(config.sources.request_timeout, Duration::from_secs(3));
        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.pipeline.default_sort, Column::ChangePercent);
        assert_eq!(config.pipeline.dataset_capacity, 8);
    }

    #[test]
    fn snapshot_url_without_trailing_slash() {
        let config = TableConfig::default();
        assert_eq!(config.snapshot_url(), "http://localhost:3000/stocks");
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let config =
            TableConfig::from_lookup(lookup(&[("STOCK_TABLE_HTTP_PORT", "eighty")])).unwrap();
        assert_eq!(config.server.http_port, 8080);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let err = TableConfig::from_lookup(lookup(&[("STOCK_API_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { ref key, .. } if key == "STOCK_API_URL"));
    }

    #[test]
    fn unknown_sort_column_is_rejected() {
        let err =
            TableConfig::from_lookup(lookup(&[("STOCK_TABLE_DEFAULT_SORT", "volume")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownColumn("volume".to_string()));
    }

    #[test]
    fn empty_event_is_rejected() {
        let err = TableConfig::from_lookup(lookup(&[("STOCK_UPDATE_EVENT", "")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyValue("STOCK_UPDATE_EVENT".to_string()));
    }
}
