//! Tests for the fetch engine

use super::*;
use crate::auth::Session;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use crate::params::{Operator, SortDirection};
use async_trait::async_trait;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Scripted Fetcher
// ============================================================================

/// In-memory collection of `records` rows served in pages
#[derive(Default)]
struct ScriptedFetcher {
    records: usize,
    delay: Duration,
    shuffle_delays: bool,
    reverse_delays: bool,
    hang: HashSet<usize>,
    hang_probe: HashSet<usize>,
    fail: HashMap<usize, PageError>,
    fail_probe: HashMap<usize, PageError>,
    panic_on: Option<usize>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    probes: AtomicUsize,
    fetches: AtomicUsize,
}

impl ScriptedFetcher {
    fn with_records(records: usize) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn delay_for(&self, page: usize) -> Duration {
        if self.shuffle_delays {
            Duration::from_millis(((page * 7) % 5 + 1) as u64)
        } else if self.reverse_delays {
            Duration::from_millis((100 - page.min(99)) as u64)
        } else {
            self.delay
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn page_body(page: usize, count: usize) -> Bytes {
    let rows: Vec<_> = (0..count)
        .map(|i| json!({"id": format!("p{page}-{i}")}))
        .collect();
    Bytes::from(
        serde_json::to_vec(&json!({
            "response_status": 0,
            "response_message": "Success",
            "response_data": rows
        }))
        .unwrap(),
    )
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> PageResult {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let index = request.page_index();
        let probe = request.is_probe();
        if probe {
            self.probes.fetch_add(1, Ordering::SeqCst);
        } else {
            self.fetches.fetch_add(1, Ordering::SeqCst);
        }

        let delay = self.delay_for(index);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if probe {
            if self.hang_probe.contains(&index) {
                std::future::pending::<()>().await;
            }
            if let Some(e) = self.fail_probe.get(&index) {
                return PageResult::failure(index, e.clone());
            }
        } else {
            if self.hang.contains(&index) {
                std::future::pending::<()>().await;
            }
            if self.panic_on == Some(index) {
                panic!("scripted panic on page {index}");
            }
            if let Some(e) = self.fail.get(&index) {
                return PageResult::failure(index, e.clone());
            }
        }

        let count = request
            .limit()
            .min(self.records.saturating_sub(request.offset()));
        PageResult::success(index, page_body(index, count))
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    id: String,
}

fn engine(fetcher: &Arc<ScriptedFetcher>) -> FetchEngine {
    FetchEngine::new(fetcher.clone(), WorkerPoolConfig::default()).unwrap()
}

fn rows_in(result: &PageResult) -> usize {
    crate::decode::record_count(result.payload().unwrap()).unwrap()
}

const ENDPOINT: &str = "List/Invoice.json";

// ============================================================================
// Requests
// ============================================================================

#[test]
fn test_page_and_probe_requests() {
    let query = ListQuery::new(ENDPOINT, 999, Parameters::new());

    let page = query.page(3);
    assert_eq!(page.offset(), 2997);
    assert_eq!(page.limit(), 999);
    assert!(!page.is_probe());

    let probe = query.probe(3);
    assert_eq!(probe.offset(), 2997);
    assert_eq!(probe.limit(), 1);
    assert!(probe.is_probe());
    assert_eq!(probe.endpoint(), ENDPOINT);
}

#[test]
fn test_single_record_pages_tell_probes_apart() {
    let query = ListQuery::new(ENDPOINT, 1, Parameters::new());

    let page = query.page(4);
    let probe = query.probe(4);
    assert_eq!(page.limit(), probe.limit());
    assert!(!page.is_probe());
    assert!(probe.is_probe());
}

#[test]
fn test_list_data_shape() {
    let params = Parameters::new()
        .filter("isActive", Operator::Eq, "1")
        .sort("amountDue", SortDirection::Ascending);
    let query = ListQuery::new(ENDPOINT, 999, params);

    let data: serde_json::Value =
        serde_json::from_str(&fetcher::list_data(&query.page(2))).unwrap();
    assert_eq!(
        data,
        json!({
            "start": 1998,
            "max": 999,
            "filters": [{"field": "isActive", "op": "=", "value": "1"}],
            "sort": [{"field": "amountDue", "asc": 1}]
        })
    );
}

#[test]
fn test_worker_pool_config_validation() {
    assert!(WorkerPoolConfig::default().validate().is_ok());
    assert!(WorkerPoolConfig::new().with_max_workers(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_page_size(0).validate().is_err());
    assert!(WorkerPoolConfig::new().with_page_size(1000).validate().is_err());
    assert!(WorkerPoolConfig::new()
        .with_request_timeout(Duration::ZERO)
        .validate()
        .is_err());

    let fetcher: Arc<dyn PageFetcher> = Arc::new(ScriptedFetcher::default());
    assert!(FetchEngine::new(fetcher, WorkerPoolConfig::new().with_max_workers(0)).is_err());
}

#[test]
fn test_page_error_from_client_error() {
    assert_eq!(
        PageError::from(Error::api("u", "BDC_1144", "Invalid filter")),
        PageError::Application {
            code: "BDC_1144".to_string(),
            message: "Invalid filter".to_string()
        }
    );
    assert!(matches!(
        PageError::from(Error::http_status(502, "bad gateway")),
        PageError::Transport(_)
    ));
    assert!(PageError::timeout(Duration::from_secs(8)).is_retryable());
    assert!(!PageError::Cancelled.is_retryable());
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_sorts_and_merges_errors() {
    let outcome = aggregate(vec![
        PageResult::failure(3, PageError::Transport("reset".to_string())),
        PageResult::success(0, page_body(0, 1)),
        PageResult::failure(1, PageError::timeout(Duration::from_secs(8))),
        PageResult::success(2, page_body(2, 1)),
    ]);

    let indices: Vec<usize> = outcome.results.iter().map(|r| r.page_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(outcome.payloads().count(), 2);

    let errors = outcome.combined_error.unwrap();
    assert_eq!(errors.pages(), vec![1, 3]);
    assert_eq!(
        errors.to_string(),
        "page 1: request timed out after 8000ms; retry later\npage 3: transport error: reset"
    );
}

#[test]
fn test_aggregate_without_errors() {
    let outcome = aggregate(vec![PageResult::success(0, page_body(0, 2))]);
    assert!(outcome.is_complete());
    assert!(outcome.combined_error.is_none());
}

#[test]
fn test_decode_records_reports_undecodable_pages() {
    let outcome = aggregate(vec![
        PageResult::success(0, page_body(0, 2)),
        PageResult::success(1, Bytes::from_static(b"{\"response_data\": 7}")),
    ]);

    let (rows, errors) = outcome.decode_records(crate::decode::decode_list::<Row>);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "p0-0");
    assert_eq!(errors.unwrap().pages(), vec![1]);
}

// ============================================================================
// Page Counting
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_count_pages_finds_first_empty_page() {
    for (records, expected) in [(0, 1), (1, 1), (999, 1), (1000, 2), (2448, 3), (999 * 7, 7)] {
        let fetcher = Arc::new(ScriptedFetcher::with_records(records));
        let pages = engine(&fetcher)
            .count_pages(ENDPOINT, Parameters::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pages, expected, "records = {records}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_count_pages_is_consistent_across_runs() {
    for _ in 0..5 {
        let fetcher = Arc::new(ScriptedFetcher {
            shuffle_delays: true,
            ..ScriptedFetcher::with_records(999 * 11 + 3)
        });
        let pages = engine(&fetcher)
            .count_pages(ENDPOINT, Parameters::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pages, 12);
    }
}

#[tokio::test(start_paused = true)]
async fn test_count_pages_probe_failure_is_an_error() {
    let fetcher = Arc::new(ScriptedFetcher {
        fail_probe: HashMap::from([(2, PageError::Transport("connection reset".to_string()))]),
        ..ScriptedFetcher::with_records(999 * 6)
    });

    let err = engine(&fetcher)
        .count_pages(ENDPOINT, Parameters::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        Error::PageCount { page, source } => {
            assert_eq!(page, 2);
            assert_eq!(source, PageError::Transport("connection reset".to_string()));
        }
        other => panic!("Expected PageCount error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_count_pages_hanging_probe_times_out() {
    let fetcher = Arc::new(ScriptedFetcher {
        hang_probe: HashSet::from([2]),
        ..ScriptedFetcher::with_records(999 * 6)
    });

    let started = Instant::now();
    let err = engine(&fetcher)
        .count_pages(ENDPOINT, Parameters::new(), &CancellationToken::new())
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(8), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(9), "elapsed {elapsed:?}");
    match err {
        Error::PageCount { page, source } => {
            assert_eq!(page, 2);
            assert_eq!(source, PageError::Timeout { timeout_ms: 8000 });
        }
        other => panic!("Expected PageCount error, got {other:?}"),
    }
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_count_pages_ignores_failures_past_the_end() {
    let fetcher = Arc::new(ScriptedFetcher {
        delay: Duration::from_millis(5),
        fail_probe: HashMap::from([(3, PageError::Transport("late".to_string()))]),
        ..ScriptedFetcher::with_records(999 * 2)
    });

    let pages = engine(&fetcher)
        .count_pages(ENDPOINT, Parameters::new(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(pages, 2);
}

#[tokio::test(start_paused = true)]
async fn test_count_pages_cancelled() {
    let fetcher = Arc::new(ScriptedFetcher::with_records(999 * 4).delay(Duration::from_secs(1)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine(&fetcher)
        .count_pages(ENDPOINT, Parameters::new(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

// ============================================================================
// Fetching
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_fetch_all_returns_every_page_once() {
    let fetcher = Arc::new(ScriptedFetcher {
        shuffle_delays: true,
        ..ScriptedFetcher::with_records(999 * 10)
    });

    let outcome = engine(&fetcher)
        .fetch_all(ENDPOINT, 7, Parameters::new(), &CancellationToken::new())
        .await;

    assert_eq!(outcome.results.len(), 7);
    let indices: HashSet<usize> = outcome.results.iter().map(|r| r.page_index).collect();
    assert_eq!(indices, (0..7).collect::<HashSet<_>>());
    assert!(outcome.is_complete());
    assert_eq!(fetcher.fetches.load(Ordering::SeqCst), 7);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_all_results_are_sorted() {
    // Later pages finish first
    let fetcher = Arc::new(ScriptedFetcher {
        reverse_delays: true,
        ..ScriptedFetcher::with_records(999 * 6)
    });

    let outcome = engine(&fetcher)
        .fetch_all(ENDPOINT, 6, Parameters::new(), &CancellationToken::new())
        .await;

    let indices: Vec<usize> = outcome.results.iter().map(|r| r.page_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_all_zero_pages() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let outcome = engine(&fetcher)
        .fetch_all(ENDPOINT, 0, Parameters::new(), &CancellationToken::new())
        .await;
    assert!(outcome.results.is_empty());
    assert!(outcome.combined_error.is_none());
}

#[test]
fn test_result_buffer_is_bounded_by_workers() {
    assert_eq!(dispatcher::result_buffer(1, 3), 1);
    assert_eq!(dispatcher::result_buffer(5, 3), 5);
    assert_eq!(dispatcher::result_buffer(usize::MAX, 3), 6);
    assert_eq!(dispatcher::result_buffer(usize::MAX, usize::MAX), usize::MAX);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_all_many_pages_through_small_buffer() {
    let fetcher = Arc::new(ScriptedFetcher::with_records(999 * 2));

    let outcome = engine(&fetcher)
        .fetch_all(ENDPOINT, 500, Parameters::new(), &CancellationToken::new())
        .await;

    assert_eq!(outcome.results.len(), 500);
    assert!(outcome
        .results
        .iter()
        .enumerate()
        .all(|(i, r)| r.page_index == i && r.is_success()));
    assert!(fetcher.peak() <= 3);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_page_times_out() {
    let fetcher = Arc::new(ScriptedFetcher {
        hang: HashSet::from([1]),
        ..ScriptedFetcher::with_records(999 * 3)
    });

    let started = Instant::now();
    let outcome = engine(&fetcher)
        .fetch_all(ENDPOINT, 3, Parameters::new(), &CancellationToken::new())
        .await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(8), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(9), "elapsed {elapsed:?}");

    assert!(outcome.results[0].is_success());
    assert_eq!(
        outcome.results[1].error(),
        Some(&PageError::Timeout { timeout_ms: 8000 })
    );
    assert!(outcome.results[2].is_success());

    let message = outcome.combined_error.unwrap().to_string();
    assert!(message.contains("page 1"), "{message}");
    assert!(message.contains("retry later"), "{message}");

    // The timed-out request was dropped
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_single_failed_page() {
    let fetcher = Arc::new(ScriptedFetcher {
        fail: HashMap::from([(
            2,
            PageError::Application {
                code: "BDC_1145".to_string(),
                message: "Session expired".to_string(),
            },
        )]),
        ..ScriptedFetcher::with_records(999 * 5)
    });

    let outcome = engine(&fetcher)
        .fetch_all(ENDPOINT, 5, Parameters::new(), &CancellationToken::new())
        .await;

    assert_eq!(outcome.payloads().count(), 4);
    let errors = outcome.combined_error.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "page 2: application error BDC_1145: Session expired"
    );
}

#[tokio::test(start_paused = true)]
async fn test_panicking_worker_reports_its_page() {
    let fetcher = Arc::new(ScriptedFetcher {
        panic_on: Some(1),
        ..ScriptedFetcher::with_records(999 * 6)
    });

    let outcome = engine(&fetcher)
        .fetch_all(ENDPOINT, 6, Parameters::new(), &CancellationToken::new())
        .await;

    assert_eq!(outcome.results.len(), 6);
    assert!(matches!(outcome.results[1].error(), Some(PageError::Worker(_))));
    assert_eq!(outcome.combined_error.unwrap().pages(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_in_flight_pages() {
    let fetcher = Arc::new(ScriptedFetcher {
        hang: HashSet::from([0, 1, 2, 3]),
        ..ScriptedFetcher::with_records(999 * 4)
    });
    let config = WorkerPoolConfig::new().with_request_timeout(Duration::from_secs(60));
    let engine = FetchEngine::new(fetcher.clone(), config).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = engine
        .fetch_all(ENDPOINT, 4, Parameters::new(), &cancel)
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.results.len(), 4);
    assert!(outcome
        .results
        .iter()
        .all(|r| r.error() == Some(&PageError::Cancelled)));
    assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_ceiling_holds_in_both_phases() {
    let fetcher = Arc::new(ScriptedFetcher::with_records(999 * 20).delay(Duration::from_millis(10)));

    let outcome = engine(&fetcher)
        .fetch_all_matching(ENDPOINT, Parameters::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 20);
    assert!(fetcher.peak() <= 3, "peak in-flight {}", fetcher.peak());
    assert!(fetcher.probes.load(Ordering::SeqCst) >= 20);
}

#[tokio::test(start_paused = true)]
async fn test_custom_worker_count_is_respected() {
    let fetcher = Arc::new(ScriptedFetcher::with_records(999 * 9).delay(Duration::from_millis(10)));
    let engine =
        FetchEngine::new(fetcher.clone(), WorkerPoolConfig::new().with_max_workers(2)).unwrap();

    engine
        .fetch_all_matching(ENDPOINT, Parameters::new(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(fetcher.peak() <= 2);
}

#[tokio::test(start_paused = true)]
async fn test_three_pages_of_records() {
    let fetcher = Arc::new(ScriptedFetcher::with_records(999 + 999 + 450));

    let outcome = engine(&fetcher)
        .fetch_all_matching(ENDPOINT, Parameters::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(outcome.combined_error.is_none());
    let counts: Vec<usize> = outcome.results.iter().map(rows_in).collect();
    assert_eq!(counts, vec![999, 999, 450]);

    let rows: Vec<Row> = outcome.into_records().unwrap();
    assert_eq!(rows.len(), 2448);
    assert_eq!(rows[999].id, "p1-0");
}

#[tokio::test(start_paused = true)]
async fn test_page_one_always_times_out() {
    let fetcher = Arc::new(ScriptedFetcher {
        hang: HashSet::from([1]),
        ..ScriptedFetcher::with_records(999 * 2 + 10)
    });

    let outcome = engine(&fetcher)
        .fetch_all_matching(ENDPOINT, Parameters::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results[0].is_success());
    assert!(outcome.results[1].error().is_some_and(PageError::is_timeout));
    assert!(outcome.results[2].is_success());
    assert!(outcome
        .combined_error
        .as_ref()
        .unwrap()
        .to_string()
        .contains("page 1"));

    let err = outcome.into_records::<Row>().unwrap_err();
    assert!(matches!(err, Error::PartialFetch(_)));
}

// ============================================================================
// HTTP Fetcher
// ============================================================================

async fn http_fetcher(server: &MockServer) -> HttpPageFetcher {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .build();
    HttpPageFetcher::new(
        HttpClient::with_config(config).unwrap(),
        Session::new("sid-123", "dev-456"),
    )
}

#[tokio::test]
async fn test_http_fetcher_sends_session_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/List/Invoice.json"))
        .and(body_string_contains("sessionId=sid-123"))
        .and(body_string_contains("devKey=dev-456"))
        .and(body_string_contains("%22start%22%3A999"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(page_body(1, 2).to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = http_fetcher(&server).await;
    let query = ListQuery::new(ENDPOINT, 999, Parameters::new());
    let result = fetcher.fetch_page(&query.page(1)).await;

    assert_eq!(result.page_index, 1);
    assert_eq!(rows_in(&result), 2);
}

#[tokio::test]
async fn test_http_fetcher_envelope_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/List/Invoice.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response_status": 1,
            "response_message": "Error",
            "response_data": {"error_code": "BDC_1144", "error_message": "Invalid filter"}
        })))
        .mount(&server)
        .await;

    let fetcher = http_fetcher(&server).await;
    let query = ListQuery::new(ENDPOINT, 999, Parameters::new());
    let result = fetcher.fetch_page(&query.probe(4)).await;

    assert_eq!(result.page_index, 4);
    assert_eq!(
        result.error(),
        Some(&PageError::Application {
            code: "BDC_1144".to_string(),
            message: "Invalid filter".to_string()
        })
    );
}

#[tokio::test]
async fn test_http_fetcher_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let fetcher = http_fetcher(&server).await;
    let query = ListQuery::new(ENDPOINT, 999, Parameters::new());
    let result = fetcher.fetch_page(&query.page(0)).await;

    assert!(matches!(result.error(), Some(PageError::Transport(m)) if m.contains("500")));
}
