//! Page counter
//!
//! The platform has no count endpoint, so the number of pages is found by
//! probing: workers claim page indices from an atomic counter and fetch the
//! first record of each page until one comes back empty.

use super::dispatcher::fetch_with_deadline;
use super::fetcher::PageFetcher;
use super::types::{ListQuery, PageError, WorkerPoolConfig};
use crate::decode::record_count;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shared probe state
///
/// `first_empty` and `first_failure` only ever decrease. A worker stops as
/// soon as the index it claims is at or past either of them.
#[derive(Debug)]
struct ProbeBounds {
    next: AtomicUsize,
    first_empty: AtomicUsize,
    first_failure: AtomicUsize,
}

impl ProbeBounds {
    fn new() -> Self {
        Self {
            // Page 0 is assumed to exist
            next: AtomicUsize::new(1),
            first_empty: AtomicUsize::new(usize::MAX),
            first_failure: AtomicUsize::new(usize::MAX),
        }
    }

    fn claim(&self) -> Option<usize> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        (index < self.limit()).then_some(index)
    }

    fn limit(&self) -> usize {
        self.first_empty
            .load(Ordering::SeqCst)
            .min(self.first_failure.load(Ordering::SeqCst))
    }

    fn mark_empty(&self, index: usize) {
        self.first_empty.fetch_min(index, Ordering::SeqCst);
    }

    fn mark_failed(&self, index: usize) {
        self.first_failure.fetch_min(index, Ordering::SeqCst);
    }
}

/// Count the pages of a query
///
/// Returns the smallest page index whose probe came back empty, which is at
/// least 1. A probe failure below that index fails the whole count. Every
/// probe task has finished by the time this returns.
pub(crate) async fn count_pages(
    fetcher: Arc<dyn PageFetcher>,
    query: Arc<ListQuery>,
    config: &WorkerPoolConfig,
    cancel: &CancellationToken,
) -> Result<usize> {
    let bounds = Arc::new(ProbeBounds::new());

    let mut probes = JoinSet::new();
    for _ in 0..config.max_workers {
        probes.spawn(probe(
            Arc::clone(&fetcher),
            Arc::clone(&query),
            Arc::clone(&bounds),
            config.request_timeout,
            cancel.clone(),
        ));
    }

    let mut failures = Vec::new();
    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok(Some(failure)) => failures.push(failure),
            Ok(None) => {}
            Err(e) => {
                probes.abort_all();
                return Err(Error::Other(format!("Page counter task failed: {e}")));
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let first_empty = bounds.first_empty.load(Ordering::SeqCst);
    if let Some((page, source)) = failures
        .into_iter()
        .filter(|(page, _)| *page < first_empty)
        .min_by_key(|(page, _)| *page)
    {
        warn!(endpoint = query.endpoint(), page, "Page count probe failed: {}", source);
        return Err(Error::PageCount { page, source });
    }

    if first_empty == usize::MAX {
        return Err(Error::Other(
            "Page counter stopped without finding an empty page".to_string(),
        ));
    }

    debug!(endpoint = query.endpoint(), pages = first_empty, "Counted pages");
    Ok(first_empty)
}

async fn probe(
    fetcher: Arc<dyn PageFetcher>,
    query: Arc<ListQuery>,
    bounds: Arc<ProbeBounds>,
    deadline: Duration,
    cancel: CancellationToken,
) -> Option<(usize, PageError)> {
    while let Some(index) = bounds.claim() {
        let request = query.probe(index);
        let fetched = fetch_with_deadline(fetcher.as_ref(), &request, deadline, &cancel).await;

        match fetched.and_then(|payload| {
            record_count(&payload).map_err(|e| PageError::Malformed(e.to_string()))
        }) {
            Ok(0) => {
                bounds.mark_empty(index);
                return None;
            }
            Ok(_) => {}
            Err(PageError::Cancelled) => return None,
            Err(e) => {
                bounds.mark_failed(index);
                return Some((index, e));
            }
        }
    }
    None
}
