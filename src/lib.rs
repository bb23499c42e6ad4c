// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # bdc-client
//!
//! A typed client for the Bill.com v2 API. Listings are fetched by a
//! bounded pool of concurrent workers: the number of pages is found first,
//! every page is then fetched under a per-request deadline, and the pages
//! come back in order together with the ones that failed.
//!
//! ## Features
//!
//! - **Session login**: credentials file or explicit values, one session per [`Client`]
//! - **Concurrent listing**: page counting and fetching with at most three requests in flight
//! - **Partial results**: pages that fail are reported by index next to the records that arrived
//! - **Typed entities**: invoices, bills, customers, vendors, payments and lists
//! - **Workflows**: open invoices report, invoice schedule shifting and stretching
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bdc_client::{Client, ClientConfig, Operator, Parameters, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::from_file(".bdc_config.json")?;
//!     let client = Client::login(&config).await?;
//!
//!     let params = Parameters::new().filter("amountDue", Operator::Gt, 0);
//!     let invoices = client.invoices().all(params).await?;
//!     println!("{} invoices with a balance", invoices.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Client / Resource<T>                    │
//! │   all()  all_partial()  since()  get()  create()  update()      │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────┬───────────────┴──────────────┬──────────────────┐
//! │ Page Counter │ Worker Pool / Dispatcher     │ Result Aggregator│
//! ├──────────────┼──────────────────────────────┼──────────────────┤
//! │ probe pages  │ shared page queue            │ order by index   │
//! │ first empty  │ per-request deadline         │ combined errors  │
//! └──────────────┴──────────────┬───────────────┴──────────────────┘
//!                               │
//! ┌─────────────────────────────┴───────────────────────────────────┐
//! │  Page Fetcher → HTTP client (retry, backoff, rate limit)        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and constants
pub mod types;

/// Login and session handling
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Response envelope decoding
pub mod decode;

/// List filters and sort keys
pub mod params;

/// Concurrent page fetch engine
pub mod fetch;

/// Client configuration
pub mod config;

/// Authenticated client
pub mod client;

/// Typed entities and resources
pub mod resources;

/// Reports and invoice workflows
pub mod reports;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::{Credentials, Session};
pub use client::Client;
pub use config::ClientConfig;
pub use fetch::{FetchEngine, FetchErrors, FetchOutcome, PageError, PageFetcher, PageResult};
pub use params::{Filter, Operator, Parameters, Sort, SortDirection};
pub use reports::StretchSummary;
pub use resources::{Entity, Invoice, Listing, Resource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
