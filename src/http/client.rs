//! HTTP client with retry and rate limiting
//!
//! Every platform call is a form-encoded `POST` whose body carries a JSON
//! `data` field plus session credentials. This client handles:
//! - Automatic retries with configurable backoff
//! - Optional rate limiting
//! - Reading the body and checking the API envelope

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::decode::check_envelope;
use crate::error::{Error, Result};
use crate::types::BackoffType;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.bill.com/api/v2/";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL every endpoint is joined onto
    pub base_url: String,
    /// Transport-level request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            backoff_type: BackoffType::Exponential,
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: format!("bdc-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with retry and rate limiting
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    base_url: Url,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        // Url::join drops the last segment unless the base ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            base_url,
            rate_limiter,
        })
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Resolve an endpoint such as `List/Invoice.json` against the base URL
    pub fn build_url(&self, endpoint: &str) -> Result<Url> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(Url::parse(endpoint)?);
        }
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// POST a form to an endpoint and return the raw body once the API
    /// envelope reports success
    pub async fn post_form(&self, endpoint: &str, form: &[(&str, String)]) -> Result<Bytes> {
        let url = self.build_url(endpoint)?;
        let body = self.send_with_retries(&url, form).await?;
        check_envelope(&body, url.as_str())?;
        Ok(body)
    }

    async fn send_with_retries(&self, url: &Url, form: &[(&str, String)]) -> Result<Bytes> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;
        let mut attempt = 0;

        while attempt <= max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self.client.post(url.clone()).form(form);
            for (key, value) in &self.config.default_headers {
                req = req.header(key.as_str(), value.as_str());
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = extract_retry_after(&response);
                        if attempt < max_retries {
                            warn!(
                                "Rate limited (429), attempt {}/{}, waiting {}s",
                                attempt + 1,
                                max_retries + 1,
                                retry_after
                            );
                            tokio::time::sleep(Duration::from_secs(retry_after)).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(Error::RateLimited {
                            retry_after_seconds: retry_after,
                        });
                    }

                    if is_retryable_status(status) && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Request failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::http_status(status.as_u16(), ""));
                        continue;
                    }

                    if status.is_client_error() || status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::http_status(status.as_u16(), body));
                    }

                    let body = response.bytes().await?;
                    debug!("POST {} succeeded ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(e) => {
                    if e.is_timeout() {
                        let timeout_ms = self.config.timeout.as_millis() as u64;
                        if attempt < max_retries {
                            let delay = self.calculate_backoff(attempt);
                            warn!(
                                "Request timeout, attempt {}/{}, retrying in {:?}",
                                attempt + 1,
                                max_retries + 1,
                                delay
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                            last_error = Some(Error::Timeout { timeout_ms });
                            continue;
                        }
                        return Err(Error::Timeout { timeout_ms });
                    }

                    if e.is_connect() && attempt < max_retries {
                        let delay = self.calculate_backoff(attempt);
                        warn!(
                            "Connection error, attempt {}/{}, retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        last_error = Some(Error::Http(e));
                        continue;
                    }

                    return Err(Error::Http(e));
                }
            }
        }

        Err(last_error.unwrap_or(Error::MaxRetriesExceeded { max_retries }))
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("max_retries", &self.config.max_retries)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Check if an HTTP status is retryable
fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status.as_u16(),
        500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
    )
}

/// Extract retry-after header value
fn extract_retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
