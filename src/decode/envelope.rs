//! API envelope handling
//!
//! Every response body has the shape
//! `{"response_status": 0|1, "response_message": "...", "response_data": ...}`.
//! A status of `1` is an application error regardless of the HTTP status.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Envelope status the platform uses for failures
pub const STATUS_ERROR: i64 = 1;

/// Generic response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// 0 on success, 1 on failure
    #[serde(default)]
    pub response_status: i64,
    /// Human-readable status ("Success", "Error")
    #[serde(default)]
    pub response_message: Option<String>,
    /// Payload
    pub response_data: T,
}

/// Error payload carried in `response_data` when `response_status == 1`
#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorData {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

/// Check the envelope of a raw response body
///
/// Returns [`Error::Api`] when the platform reports a failure and
/// [`Error::JsonParse`] when the body is not JSON at all.
pub fn check_envelope(body: &[u8], url: &str) -> Result<()> {
    let envelope: ApiEnvelope<Option<JsonValue>> = serde_json::from_slice(body)?;
    if envelope.response_status != STATUS_ERROR {
        return Ok(());
    }

    let data = envelope
        .response_data
        .and_then(|v| serde_json::from_value::<ErrorData>(v).ok())
        .unwrap_or_default();
    Err(Error::api(url, data.error_code, data.error_message))
}

/// Deserialize a list payload into typed records
pub fn decode_list<T: DeserializeOwned>(payload: &[u8]) -> Result<Vec<T>> {
    let envelope: ApiEnvelope<Option<Vec<T>>> = serde_json::from_slice(payload)
        .map_err(|e| Error::decode(format!("Failed to decode list response: {e}")))?;
    Ok(envelope.response_data.unwrap_or_default())
}

/// Deserialize a single-object payload
pub fn decode_one<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    let envelope: ApiEnvelope<T> = serde_json::from_slice(payload)
        .map_err(|e| Error::decode(format!("Failed to decode response: {e}")))?;
    Ok(envelope.response_data)
}

/// Number of records in a list payload
///
/// A missing or non-array `response_data` counts as an empty page.
pub fn record_count(payload: &[u8]) -> Result<usize> {
    let envelope: ApiEnvelope<Option<JsonValue>> = serde_json::from_slice(payload)?;
    Ok(match envelope.response_data {
        Some(JsonValue::Array(items)) => items.len(),
        _ => 0,
    })
}
