//! Fetch engine types
//!
//! Requests, per-page results, the aggregated outcome, and the worker pool
//! configuration. All of these live for a single "fetch all" call.

use crate::error::{Error, Result};
use crate::params::Parameters;
use crate::types::{CONCURRENCY_CEILING, PAGE_SIZE_MAX};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Requests
// ============================================================================

/// The fixed part of a list query: endpoint, page size and criteria
///
/// Every [`PageRequest`] of one fetch is stamped out of the same query, so
/// counting and fetching always use identical filters.
#[derive(Debug, Clone)]
pub struct ListQuery {
    endpoint: Arc<str>,
    page_size: usize,
    params: Arc<Parameters>,
}

impl ListQuery {
    /// Create a query against an endpoint such as `List/Invoice.json`
    pub fn new(endpoint: impl Into<Arc<str>>, page_size: usize, params: Parameters) -> Self {
        Self {
            endpoint: endpoint.into(),
            page_size,
            params: Arc::new(params),
        }
    }

    /// Endpoint path
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Records per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Filter and sort criteria
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Request for a full page
    pub fn page(&self, page_index: usize) -> PageRequest {
        PageRequest {
            endpoint: Arc::clone(&self.endpoint),
            page_index,
            page_size: self.page_size,
            limit: self.page_size,
            probe: false,
            params: Arc::clone(&self.params),
        }
    }

    /// Request for the first record of a page only
    pub fn probe(&self, page_index: usize) -> PageRequest {
        PageRequest {
            limit: 1,
            probe: true,
            ..self.page(page_index)
        }
    }
}

/// One page of one list query
#[derive(Debug, Clone)]
pub struct PageRequest {
    endpoint: Arc<str>,
    page_index: usize,
    page_size: usize,
    limit: usize,
    probe: bool,
    params: Arc<Parameters>,
}

impl PageRequest {
    /// Endpoint path
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Zero-based page index
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Records per page used to compute the offset
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Maximum records requested (1 for probes)
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Offset of the first record of this page
    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Whether this is a 1-record existence probe
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    /// Filter and sort criteria
    pub fn params(&self) -> &Parameters {
        &self.params
    }
}

// ============================================================================
// Per-Page Results
// ============================================================================

/// Why a single page could not be fetched
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    /// Network-level failure or non-success HTTP status
    #[error("transport error: {0}")]
    Transport(String),

    /// The platform's own error envelope
    #[error("application error {code}: {message}")]
    Application { code: String, message: String },

    /// The body could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Worker-enforced deadline elapsed
    #[error("request timed out after {timeout_ms}ms; retry later")]
    Timeout { timeout_ms: u64 },

    /// The caller cancelled the fetch before this page completed
    #[error("cancelled before completion")]
    Cancelled,

    /// The worker task responsible for this page died
    #[error("worker failed: {0}")]
    Worker(String),
}

impl PageError {
    /// Create a timeout error for the given deadline
    pub fn timeout(deadline: Duration) -> Self {
        Self::Timeout {
            timeout_ms: deadline.as_millis() as u64,
        }
    }

    /// Whether re-running the fetch may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PageError::Transport(_) | PageError::Timeout { .. } | PageError::Worker(_)
        )
    }

    /// Whether this is a worker-enforced timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, PageError::Timeout { .. })
    }
}

impl From<Error> for PageError {
    fn from(err: Error) -> Self {
        match err {
            Error::Api { code, message, .. } => PageError::Application { code, message },
            Error::JsonParse(e) => PageError::Malformed(e.to_string()),
            Error::Decode { message } => PageError::Malformed(message),
            Error::Cancelled => PageError::Cancelled,
            other => PageError::Transport(other.to_string()),
        }
    }
}

/// Result of fetching one page
#[derive(Debug, Clone)]
pub struct PageResult {
    /// Zero-based page index
    pub page_index: usize,
    /// Raw payload or the reason it is missing
    pub outcome: std::result::Result<Bytes, PageError>,
}

impl PageResult {
    /// Create a successful result
    pub fn success(page_index: usize, payload: Bytes) -> Self {
        Self {
            page_index,
            outcome: Ok(payload),
        }
    }

    /// Create a failed result
    pub fn failure(page_index: usize, error: PageError) -> Self {
        Self {
            page_index,
            outcome: Err(error),
        }
    }

    /// Whether the page was fetched
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Raw payload, if fetched
    pub fn payload(&self) -> Option<&Bytes> {
        self.outcome.as_ref().ok()
    }

    /// Error, if the page failed
    pub fn error(&self) -> Option<&PageError> {
        self.outcome.as_ref().err()
    }
}

// ============================================================================
// Aggregated Outcome
// ============================================================================

/// Every page error of one fetch, in page order
///
/// Displays as `page <i>: <message>` lines joined by newlines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchErrors {
    errors: Vec<(usize, PageError)>,
}

impl FetchErrors {
    /// Record a page error
    pub fn push(&mut self, page_index: usize, error: PageError) {
        self.errors.push((page_index, error));
    }

    /// Number of failed pages
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no page failed
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over `(page_index, error)` pairs
    pub fn iter(&self) -> impl Iterator<Item = &(usize, PageError)> {
        self.errors.iter()
    }

    /// Indices of the failed pages
    pub fn pages(&self) -> Vec<usize> {
        self.errors.iter().map(|(page, _)| *page).collect()
    }
}

impl fmt::Display for FetchErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (page, error)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "page {page}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FetchErrors {}

/// Outcome of fetching every page of a query
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// One result per page, sorted by page index
    pub results: Vec<PageResult>,
    /// Set iff at least one page failed
    pub combined_error: Option<FetchErrors>,
}

impl FetchOutcome {
    /// Number of pages in the outcome
    pub fn page_count(&self) -> usize {
        self.results.len()
    }

    /// Whether every page was fetched
    pub fn is_complete(&self) -> bool {
        self.combined_error.is_none()
    }

    /// Payloads of the successful pages, in page order
    pub fn payloads(&self) -> impl Iterator<Item = &Bytes> {
        self.results.iter().filter_map(PageResult::payload)
    }

    /// Decode every successful page with `decode` and concatenate the records
    ///
    /// Pages that fail to decode are added to the returned errors rather than
    /// aborting the whole listing.
    pub fn decode_records<T, F>(&self, decode: F) -> (Vec<T>, Option<FetchErrors>)
    where
        F: Fn(&[u8]) -> Result<Vec<T>>,
    {
        let mut records = Vec::new();
        let mut errors = self.combined_error.clone().unwrap_or_default();
        let mut decode_failed = false;

        for result in &self.results {
            if let Some(payload) = result.payload() {
                match decode(payload) {
                    Ok(page) => records.extend(page),
                    Err(e) => {
                        errors.push(result.page_index, PageError::from(e));
                        decode_failed = true;
                    }
                }
            }
        }

        if decode_failed {
            errors.errors.sort_by_key(|(page, _)| *page);
        }
        (records, (!errors.is_empty()).then_some(errors))
    }

    /// Decode every page as a list of `T`, failing on any page error
    pub fn into_records<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let (records, errors) = self.decode_records(crate::decode::decode_list::<T>);
        match errors {
            Some(errors) => Err(Error::PartialFetch(errors)),
            None => Ok(records),
        }
    }
}

// ============================================================================
// Worker Pool Configuration
// ============================================================================

/// Worker pool settings for one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Upper bound on simultaneous requests, counting and fetching alike
    pub max_workers: usize,
    /// Deadline for each page request
    pub request_timeout: Duration,
    /// Records per page (at most 999)
    pub page_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_workers: CONCURRENCY_CEILING,
            request_timeout: Duration::from_secs(8),
            page_size: PAGE_SIZE_MAX,
        }
    }
}

impl WorkerPoolConfig {
    /// Create the default pool configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::invalid_value("max_workers", "must be at least 1"));
        }
        if self.page_size == 0 || self.page_size > PAGE_SIZE_MAX {
            return Err(Error::invalid_value(
                "page_size",
                format!("must be between 1 and {PAGE_SIZE_MAX}"),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(Error::invalid_value("request_timeout", "must be non-zero"));
        }
        Ok(())
    }
}
