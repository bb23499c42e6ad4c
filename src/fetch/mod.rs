//! Paginated concurrent fetch engine
//!
//! Fetching "everything matching X" from a list endpoint happens in two
//! phases:
//!
//! 1. **Count**: probe page indices with 1-record requests until an empty
//!    page is found.
//! 2. **Fetch**: a pool of workers claims page indices `0..N` from a shared
//!    queue and fetches each page under a deadline.
//!
//! The results are then sorted by page index and their errors merged into
//! one [`FetchErrors`] value.
//!
//! # Concurrency ceiling
//!
//! The platform rejects sessions that run more than three requests at once.
//! Each call of [`FetchEngine::fetch_all_matching`] keeps at most
//! [`WorkerPoolConfig::max_workers`] requests in flight, and counting
//! finishes before fetching starts. The ceiling is per call: two listings
//! running at the same time on one session each get their own pool.
//!
//! # Example
//!
//! ```rust,ignore
//! use bdc_client::fetch::{FetchEngine, WorkerPoolConfig};
//! use bdc_client::params::{Operator, Parameters};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = FetchEngine::new(fetcher, WorkerPoolConfig::default())?;
//! let params = Parameters::new().filter("isActive", Operator::Eq, "1");
//! let outcome = engine
//!     .fetch_all_matching("List/Invoice.json", params, &CancellationToken::new())
//!     .await?;
//! ```

mod aggregate;
mod counter;
mod dispatcher;
mod fetcher;
mod types;

pub use aggregate::aggregate;
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use types::{
    FetchErrors, FetchOutcome, ListQuery, PageError, PageRequest, PageResult, WorkerPoolConfig,
};

use crate::error::Result;
use crate::params::Parameters;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Counts and fetches every page of a list query
#[derive(Clone)]
pub struct FetchEngine {
    fetcher: Arc<dyn PageFetcher>,
    config: WorkerPoolConfig,
}

impl FetchEngine {
    /// Create an engine over a page fetcher
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: WorkerPoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { fetcher, config })
    }

    /// Worker pool configuration
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Build a query with this engine's page size
    pub fn query(&self, endpoint: &str, params: Parameters) -> ListQuery {
        ListQuery::new(endpoint, self.config.page_size, params)
    }

    /// Count the pages matching `params`
    #[instrument(skip(self, params, cancel))]
    pub async fn count_pages(
        &self,
        endpoint: &str,
        params: Parameters,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let query = Arc::new(self.query(endpoint, params));
        counter::count_pages(Arc::clone(&self.fetcher), query, &self.config, cancel).await
    }

    /// Fetch pages `0..total_pages`
    ///
    /// Returns exactly `total_pages` results in page order. Pages that were
    /// not fetched carry their error; the call itself never fails.
    #[instrument(skip(self, params, cancel))]
    pub async fn fetch_all(
        &self,
        endpoint: &str,
        total_pages: usize,
        params: Parameters,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let query = Arc::new(self.query(endpoint, params));
        dispatcher::dispatch(
            Arc::clone(&self.fetcher),
            query,
            total_pages,
            &self.config,
            cancel,
        )
        .await
    }

    /// Count the pages matching `params`, then fetch all of them
    ///
    /// A counting failure is returned as an error. Page failures during the
    /// fetch phase are reported in [`FetchOutcome::combined_error`] next to
    /// the pages that did arrive.
    #[instrument(skip(self, params, cancel))]
    pub async fn fetch_all_matching(
        &self,
        endpoint: &str,
        params: Parameters,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome> {
        let query = Arc::new(self.query(endpoint, params));

        let total_pages =
            counter::count_pages(Arc::clone(&self.fetcher), Arc::clone(&query), &self.config, cancel)
                .await?;

        let outcome = dispatcher::dispatch(
            Arc::clone(&self.fetcher),
            query,
            total_pages,
            &self.config,
            cancel,
        )
        .await;

        info!(
            pages = outcome.page_count(),
            failed = outcome.combined_error.as_ref().map_or(0, FetchErrors::len),
            "Fetched all pages"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
