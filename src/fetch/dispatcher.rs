//! Worker pool and dispatcher
//!
//! A fixed number of tokio tasks claim page indices from a shared atomic
//! queue, fetch each page under a deadline and send the result into a
//! channel. The queue and the channel are the only shared mutable state.

use super::aggregate::aggregate;
use super::fetcher::PageFetcher;
use super::types::{FetchOutcome, ListQuery, PageError, PageRequest, PageResult, WorkerPoolConfig};
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Page indices `0..total` handed out exactly once each
#[derive(Debug)]
pub(crate) struct PageQueue {
    next: AtomicUsize,
    total: usize,
}

impl PageQueue {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            total,
        }
    }

    /// Claim the next unclaimed index, or `None` once the queue is drained
    pub(crate) fn claim(&self) -> Option<usize> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        (index < self.total).then_some(index)
    }
}

/// Results buffered between the workers and the collector
///
/// Bounded by the pool size, not by the page count, so any `total_pages`
/// a caller passes is safe to allocate for.
pub(crate) fn result_buffer(total_pages: usize, workers: usize) -> usize {
    total_pages.min(workers.saturating_mul(2)).max(1)
}

/// Run one fetch against the deadline and the cancellation token
///
/// When either fires first the fetch future is dropped, which drops the
/// in-flight request with it.
pub(crate) async fn fetch_with_deadline(
    fetcher: &dyn PageFetcher,
    request: &PageRequest,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<Bytes, PageError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PageError::Cancelled),
        fetched = tokio::time::timeout(deadline, fetcher.fetch_page(request)) => match fetched {
            Ok(result) => result.outcome,
            Err(_) => {
                warn!(
                    endpoint = request.endpoint(),
                    page = request.page_index(),
                    "Request timed out after {:?}",
                    deadline
                );
                Err(PageError::timeout(deadline))
            }
        },
    }
}

/// Fetch pages `0..total_pages` with at most `max_workers` requests in flight
///
/// Always returns exactly `total_pages` results, sorted by page index.
pub(crate) async fn dispatch(
    fetcher: Arc<dyn PageFetcher>,
    query: Arc<ListQuery>,
    total_pages: usize,
    config: &WorkerPoolConfig,
    cancel: &CancellationToken,
) -> FetchOutcome {
    if total_pages == 0 {
        return aggregate(Vec::new());
    }

    let queue = Arc::new(PageQueue::new(total_pages));
    let workers = config.max_workers.min(total_pages);
    let (tx, mut rx) = mpsc::channel(result_buffer(total_pages, workers));

    debug!(
        endpoint = query.endpoint(),
        total_pages, workers, "Starting fetch workers"
    );

    let mut tasks = JoinSet::new();
    for worker_id in 0..workers {
        let worker = Worker {
            id: worker_id,
            fetcher: Arc::clone(&fetcher),
            query: Arc::clone(&query),
            queue: Arc::clone(&queue),
            deadline: config.request_timeout,
            cancel: cancel.clone(),
            results: tx.clone(),
        };
        tasks.spawn(worker.run());
    }
    drop(tx);

    let mut results = Vec::new();
    while let Some(result) = rx.recv().await {
        results.push(result);
    }

    let mut worker_failure = None;
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            warn!("Fetch worker failed: {}", e);
            worker_failure = Some(e.to_string());
        }
    }

    // A worker that died took its claimed page with it
    if results.len() < total_pages {
        let seen: HashSet<usize> = results.iter().map(|r| r.page_index).collect();
        let reason = worker_failure.unwrap_or_else(|| "result was never reported".to_string());
        for index in (0..total_pages).filter(|i| !seen.contains(i)) {
            results.push(PageResult::failure(index, PageError::Worker(reason.clone())));
        }
    }

    aggregate(results)
}

struct Worker {
    id: usize,
    fetcher: Arc<dyn PageFetcher>,
    query: Arc<ListQuery>,
    queue: Arc<PageQueue>,
    deadline: Duration,
    cancel: CancellationToken,
    results: mpsc::Sender<PageResult>,
}

impl Worker {
    async fn run(self) {
        while let Some(index) = self.queue.claim() {
            let request = self.query.page(index);
            let outcome =
                fetch_with_deadline(self.fetcher.as_ref(), &request, self.deadline, &self.cancel)
                    .await;

            if let Err(ref e) = outcome {
                debug!(worker = self.id, page = index, "Page failed: {}", e);
            }

            let result = PageResult {
                page_index: index,
                outcome,
            };
            if self.results.send(result).await.is_err() {
                break;
            }
        }
    }
}
