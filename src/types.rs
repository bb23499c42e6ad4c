//! Common types used throughout the client
//!
//! Shared type aliases, wire formats, and small enums used across
//! multiple modules.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Wire Formats
// ============================================================================

/// Timestamp format used by the platform (e.g. `2019-01-02T02:01:41.000+0000`)
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Date format used by the platform (e.g. `2019-01-01`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Server-side maximum number of records per list request
pub const PAGE_SIZE_MAX: usize = 999;

/// Documented server-side ceiling on concurrent requests per session
pub const CONCURRENCY_CEILING: usize = 3;

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};

    #[test]
    fn test_backoff_type_serde() {
        let json = serde_json::to_string(&BackoffType::Linear).unwrap();
        assert_eq!(json, "\"linear\"");

        let parsed: BackoffType = serde_json::from_str("\"constant\"").unwrap();
        assert_eq!(parsed, BackoffType::Constant);
        assert_eq!(BackoffType::default(), BackoffType::Exponential);
    }

    #[test]
    fn test_time_format_round_trips_platform_timestamps() {
        let parsed = DateTime::parse_from_str("2019-01-02T02:01:41.000+0000", TIME_FORMAT).unwrap();
        assert_eq!(
            parsed.format(TIME_FORMAT).to_string(),
            "2019-01-02T02:01:41.000+0000"
        );
    }

    #[test]
    fn test_date_format() {
        let date = NaiveDate::parse_from_str("2019-01-01", DATE_FORMAT).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
    }
}
