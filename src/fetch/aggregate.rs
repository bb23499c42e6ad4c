//! Result aggregation

use super::types::{FetchErrors, FetchOutcome, PageResult};

/// Sort results by page index and merge their errors
///
/// Successful payloads are kept as they are. `combined_error` is set only
/// when at least one page failed.
pub fn aggregate(mut results: Vec<PageResult>) -> FetchOutcome {
    results.sort_by_key(|r| r.page_index);

    let mut errors = FetchErrors::default();
    for result in &results {
        if let Some(error) = result.error() {
            errors.push(result.page_index, error.clone());
        }
    }

    FetchOutcome {
        results,
        combined_error: (!errors.is_empty()).then_some(errors),
    }
}
