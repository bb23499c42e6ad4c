//! Client configuration
//!
//! A config file names the credentials file and tunes the HTTP layer and
//! the fetch engine. JSON and YAML are both accepted; the format is picked
//! from the file extension. Every field has a default, so an empty object
//! is a valid config.
//!
//! ```yaml
//! credentials_file: bdc_credentials.json
//! http:
//!   timeout_seconds: 30
//!   max_retries: 2
//! fetch:
//!   max_workers: 3
//!   request_timeout_seconds: 8
//!   page_size: 999
//! ```

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::fetch::WorkerPoolConfig;
use crate::http::{HttpClientConfig, RateLimiterConfig, DEFAULT_BASE_URL};
use crate::types::{BackoffType, CONCURRENCY_CEILING, PAGE_SIZE_MAX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up when none is given
pub const DEFAULT_CONFIG_PATH: &str = ".bdc_config.json";

// ============================================================================
// Top-Level Client Config
// ============================================================================

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root every endpoint is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Credentials file, relative to the config file's directory
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Fetch engine settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Directory of the file this config was loaded from
    #[serde(skip)]
    source_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credentials_file: default_credentials_file(),
            http: HttpConfig::default(),
            fetch: FetchConfig::default(),
            source_dir: None,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("bdc_credentials.json")
}

impl ClientConfig {
    /// Load a config file, JSON or YAML by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = if is_yaml(path) {
            Self::from_yaml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        config.source_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse a YAML config
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config as pretty JSON
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        let body = serde_json::to_string_pretty(&Self::default())?;
        std::fs::write(path, body)?;
        Ok(())
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;

        if self.http.timeout_seconds == 0 {
            return Err(Error::invalid_value("http.timeout_seconds", "must be non-zero"));
        }
        if self.fetch.max_workers == 0 {
            return Err(Error::invalid_value("fetch.max_workers", "must be at least 1"));
        }
        if self.fetch.request_timeout_seconds == 0 {
            return Err(Error::invalid_value(
                "fetch.request_timeout_seconds",
                "must be non-zero",
            ));
        }
        if self.fetch.page_size == 0 || self.fetch.page_size > PAGE_SIZE_MAX {
            return Err(Error::invalid_value(
                "fetch.page_size",
                format!("must be between 1 and {PAGE_SIZE_MAX}"),
            ));
        }
        Ok(())
    }

    /// Credentials file path, resolved against the config file's directory
    pub fn credentials_path(&self) -> PathBuf {
        match &self.source_dir {
            Some(dir) if self.credentials_file.is_relative() => dir.join(&self.credentials_file),
            _ => self.credentials_file.clone(),
        }
    }

    /// Load the credentials this config points at
    pub fn load_credentials(&self) -> Result<Credentials> {
        Credentials::from_file(self.credentials_path())
    }

    /// Settings for the HTTP client
    pub fn http_client_config(&self) -> HttpClientConfig {
        let http = &self.http;
        let mut builder = HttpClientConfig::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(http.timeout_seconds))
            .max_retries(http.max_retries)
            .backoff(
                http.retry_backoff.backoff_type,
                Duration::from_millis(http.retry_backoff.initial_ms),
                Duration::from_millis(http.retry_backoff.max_ms),
            );

        if let Some(rate_limit) = &http.rate_limit {
            builder = builder.rate_limit(rate_limit.clone());
        }
        if let Some(agent) = &http.user_agent {
            builder = builder.user_agent(agent);
        }
        for (key, value) in &http.headers {
            builder = builder.header(key, value);
        }
        builder.build()
    }

    /// Settings for the fetch engine
    pub fn worker_pool_config(&self) -> WorkerPoolConfig {
        WorkerPoolConfig::new()
            .with_max_workers(self.fetch.max_workers)
            .with_request_timeout(Duration::from_secs(self.fetch.request_timeout_seconds))
            .with_page_size(self.fetch.page_size)
    }

    /// Override the credentials file
    #[must_use]
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = path.into();
        self.source_dir = None;
        self
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Transport timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,

    /// Optional client-side rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Extra headers for every request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
            rate_limit: None,
            user_agent: None,
            headers: HashMap::new(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

/// Backoff configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    10_000
}

// ============================================================================
// Fetch Config
// ============================================================================

/// Fetch engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Simultaneous requests per listing
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Deadline for each page request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Records per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            request_timeout_seconds: default_request_timeout(),
            page_size: default_page_size(),
        }
    }
}

fn default_max_workers() -> usize {
    CONCURRENCY_CEILING
}

fn default_request_timeout() -> u64 {
    8
}

fn default_page_size() -> usize {
    PAGE_SIZE_MAX
}
