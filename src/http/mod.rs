//! HTTP client module
//!
//! Provides the form-POST client every platform call goes through.
//!
//! # Features
//!
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Envelope Checking**: Application errors in a `200 OK` body become errors

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, DEFAULT_BASE_URL};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
