//! Authenticated client
//!
//! A [`Client`] is an explicit value: build one per session and pass it
//! around. Cloning is cheap and clones share the connection pool.

use crate::auth::{login, Credentials, Session};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::fetch::{FetchEngine, HttpPageFetcher, PageFetcher};
use crate::http::HttpClient;
use crate::resources::{
    ActgClass, Bill, Customer, Entity, Invoice, Item, Location, PaymentMade, PaymentReceived,
    Resource, Vendor,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;

/// Client for one authenticated session
#[derive(Debug, Clone)]
pub struct Client {
    http: HttpClient,
    session: Session,
    engine: FetchEngine,
}

impl Client {
    /// Log in with the credentials file named by `config`
    pub async fn login(config: &ClientConfig) -> Result<Self> {
        let credentials = config.load_credentials()?;
        Self::login_with(config, &credentials).await
    }

    /// Log in with explicit credentials
    pub async fn login_with(config: &ClientConfig, credentials: &Credentials) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_config(config.http_client_config())?;
        let session = login(&http, credentials).await?;
        Self::assemble(config, http, session)
    }

    /// Reuse a session opened elsewhere
    pub fn from_session(config: &ClientConfig, session: Session) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_config(config.http_client_config())?;
        Self::assemble(config, http, session)
    }

    /// Use a custom page fetcher for listings
    pub fn with_page_fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        self.engine = FetchEngine::new(fetcher, self.engine.config().clone())?;
        Ok(self)
    }

    fn assemble(config: &ClientConfig, http: HttpClient, session: Session) -> Result<Self> {
        let fetcher = Arc::new(HttpPageFetcher::new(http.clone(), session.clone()));
        let engine = FetchEngine::new(fetcher, config.worker_pool_config())?;
        Ok(Self {
            http,
            session,
            engine,
        })
    }

    /// The session this client authenticates with
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The fetch engine used for listings
    pub fn engine(&self) -> &FetchEngine {
        &self.engine
    }

    /// POST `data` as JSON with the session credentials
    pub async fn post<D: Serialize + ?Sized>(&self, endpoint: &str, data: &D) -> Result<Bytes> {
        let data = serde_json::to_string(data)?;
        self.http.post_form(endpoint, &self.session.form(data)).await
    }

    /// Typed access to any entity
    pub fn resource<T: Entity>(&self) -> Resource<'_, T> {
        Resource::new(self)
    }

    pub fn invoices(&self) -> Resource<'_, Invoice> {
        self.resource()
    }

    pub fn bills(&self) -> Resource<'_, Bill> {
        self.resource()
    }

    pub fn customers(&self) -> Resource<'_, Customer> {
        self.resource()
    }

    pub fn vendors(&self) -> Resource<'_, Vendor> {
        self.resource()
    }

    pub fn payments_made(&self) -> Resource<'_, PaymentMade> {
        self.resource()
    }

    pub fn payments_received(&self) -> Resource<'_, PaymentReceived> {
        self.resource()
    }

    pub fn locations(&self) -> Resource<'_, Location> {
        self.resource()
    }

    pub fn classes(&self) -> Resource<'_, ActgClass> {
        self.resource()
    }

    pub fn items(&self) -> Resource<'_, Item> {
        self.resource()
    }
}
