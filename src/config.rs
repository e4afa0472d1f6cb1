//! Configuration types for sl-export
//!
//! Every setting lives in an explicit [`Config`] value that is handed to the
//! transport, the request executor and the streamer. Nothing is read from
//! process-wide state after startup.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};
use url::Url;

/// Service Layer connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base address of the Service Layer (e.g. `https://host:50000/b1s/v1`)
    pub base_url: String,

    /// Company database to log into
    #[serde(default)]
    pub company_db: String,

    /// Service Layer user
    #[serde(default)]
    pub username: String,

    /// Service Layer password
    #[serde(default)]
    pub password: String,

    /// Verify TLS certificates (default: false, Service Layer installs are
    /// usually self-signed)
    #[serde(default)]
    pub verify_tls: bool,

    /// Timeout for each individual GET attempt (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Timeout for the login request (default: 60 seconds)
    #[serde(default = "default_login_timeout", with = "duration_serde")]
    pub login_timeout: Duration,
}

impl ServiceConfig {
    /// Create a service config for `base_url` with default timeouts and no credentials
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            company_db: String::new(),
            username: String::new(),
            password: String::new(),
            verify_tls: false,
            request_timeout: default_request_timeout(),
            login_timeout: default_login_timeout(),
        }
    }

    /// Parse the base address, normalized to end with a single `/` so that
    /// relative paths join underneath it instead of replacing its last segment
    pub fn base(&self) -> Result<Url> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(Error::config("base URL is empty", "base_url"));
        }
        Ok(Url::parse(&format!("{trimmed}/"))?)
    }
}

/// Retry behavior for transient Service Layer failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one (default: 4)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1.5 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Upper bound for a single delay (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Paging settings for collection streams
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Records requested per page via `$top` and `odata.maxpagesize` (default: 1000)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// Output and export pacing settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the CSV files are written to (default: "./out")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Concurrent price lookups (default: 16)
    #[serde(default = "default_price_workers")]
    pub price_workers: usize,

    /// Log a progress line every N rows (default: 2000)
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,

    /// Log a progress line every N invoices during the line export (default: 500)
    #[serde(default = "default_invoice_progress_every")]
    pub invoice_progress_every: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            price_workers: default_price_workers(),
            progress_every: default_progress_every(),
            invoice_progress_every: default_invoice_progress_every(),
        }
    }
}

/// Main configuration for sl-export
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Service Layer connection
    pub service: ServiceConfig,

    /// Retry policy for GET requests
    #[serde(default)]
    pub retry: RetryConfig,

    /// Paging settings
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Output settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Create a config for `base_url` with every other setting at its default
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            service: ServiceConfig::new(base_url),
            retry: RetryConfig::default(),
            pagination: PaginationConfig::default(),
            export: ExportConfig::default(),
        }
    }

    /// Load a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Check the settings that would otherwise fail deep inside an export
    pub fn validate(&self) -> Result<()> {
        self.service.base()?;
        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "at least one attempt is required",
                "retry.max_attempts",
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "backoff multiplier must be >= 1.0",
                "retry.backoff_multiplier",
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(Error::config(
                "page size must be positive",
                "pagination.page_size",
            ));
        }
        if self.export.price_workers == 0 {
            return Err(Error::config(
                "at least one price worker is required",
                "export.price_workers",
            ));
        }
        Ok(())
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_login_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(1500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_page_size() -> u32 {
    1000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_price_workers() -> usize {
    16
}

fn default_progress_every() -> u64 {
    2000
}

fn default_invoice_progress_every() -> u64 {
    500
}

// Durations are written as integer milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_service_layer_behavior() {
        let config = Config::new("https://sl.example.com:50000/b1s/v1");

        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(1500));
        assert_eq!(config.retry.backoff_multiplier, 2.0);
        assert!(!config.retry.jitter);
        assert_eq!(config.pagination.page_size, 1000);
        assert_eq!(config.export.price_workers, 16);
        assert_eq!(config.service.request_timeout, Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn base_url_gets_single_trailing_slash() {
        let service = ServiceConfig::new("https://sl.example.com:50000/b1s/v1///");
        let base = service.base().unwrap();
        assert_eq!(base.as_str(), "https://sl.example.com:50000/b1s/v1/");
        assert_eq!(
            base.join("Items").unwrap().as_str(),
            "https://sl.example.com:50000/b1s/v1/Items"
        );
    }

    #[test]
    fn empty_base_url_is_a_config_error() {
        let err = ServiceConfig::new("  ").base().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "base_url"));
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::new("https://sl/b1s/v1");
        config.pagination.page_size = 0;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, Error::Config { key: Some(ref k), .. } if k == "pagination.page_size")
        );
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::new("https://sl/b1s/v1");
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let json = r#"{
            "service": { "base_url": "https://sl/b1s/v1", "request_timeout": 5000 },
            "retry": { "initial_delay": 10 }
        }"#;

        let config: Config = serde_json::from_str(json).expect("deserialize failed");

        assert_eq!(config.service.request_timeout, Duration::from_secs(5));
        assert_eq!(config.service.login_timeout, Duration::from_secs(60));
        assert_eq!(config.retry.initial_delay, Duration::from_millis(10));
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.pagination.page_size, 1000);
        assert_eq!(config.export.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn durations_serialize_as_milliseconds() {
        let json = serde_json::to_value(RetryConfig::default()).expect("serialize failed");
        assert_eq!(json["initial_delay"], 1500);
        assert_eq!(json["max_delay"], 60_000);
    }

    #[test]
    fn config_file_round_trips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sl-export.json");
        let mut config = Config::new("https://sl/b1s/v1");
        config.export.price_workers = 4;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = Config::from_json_file(&path).unwrap();
        assert_eq!(loaded.export.price_workers, 4);
        assert_eq!(loaded.service.base_url, "https://sl/b1s/v1");
    }
}
