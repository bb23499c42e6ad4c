//! Page fetcher
//!
//! One network call for one page. The trait is the seam the dispatcher and
//! the page counter are written against; production code uses
//! [`HttpPageFetcher`].

use super::types::{PageError, PageRequest, PageResult};
use crate::auth::Session;
use crate::http::HttpClient;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

/// Fetches a single page of a list endpoint
///
/// Implementations never fail as a whole: transport and application errors
/// come back inside the [`PageResult`] tagged with the page index.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page
    async fn fetch_page(&self, request: &PageRequest) -> PageResult;
}

/// Page fetcher backed by the platform's `List/<Entity>.json` endpoints
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http: HttpClient,
    session: Session,
}

impl HttpPageFetcher {
    /// Create a fetcher using an authenticated session
    pub fn new(http: HttpClient, session: Session) -> Self {
        Self { http, session }
    }
}

/// JSON `data` member of a list request
pub(crate) fn list_data(request: &PageRequest) -> String {
    let params = request.params();
    json!({
        "start": request.offset(),
        "max": request.limit(),
        "filters": params.filters,
        "sort": params.sorts,
    })
    .to_string()
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> PageResult {
        let index = request.page_index();
        let form = self.session.form(list_data(request));

        match self.http.post_form(request.endpoint(), &form).await {
            Ok(body) => {
                debug!(
                    endpoint = request.endpoint(),
                    page = index,
                    bytes = body.len(),
                    "Fetched page"
                );
                PageResult::success(index, body)
            }
            Err(e) => PageResult::failure(index, PageError::from(e)),
        }
    }
}
