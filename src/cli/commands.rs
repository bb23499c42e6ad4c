//! CLI commands and argument parsing

use crate::params::{Filter, Operator, Sort, SortDirection};
use crate::types::JsonValue;
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line client for the Bill.com v2 API
#[derive(Parser, Debug)]
#[command(name = "bdc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client config file (JSON or YAML); defaults to ./.bdc_config.json
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Credentials file, overriding the one named in the config
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every record of a resource
    List {
        /// Resource to list
        resource: ResourceKind,

        /// Filter as field:op:value, e.g. amountDue:>:0 (repeatable)
        #[arg(long, value_parser = parse_filter)]
        filter: Vec<Filter>,

        /// Sort as field or field:desc (repeatable)
        #[arg(long, value_parser = parse_sort)]
        sort: Vec<Sort>,

        /// Only records updated after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<FixedOffset>>,
    },

    /// Count the pages a listing would fetch
    Count {
        /// Resource to count
        resource: ResourceKind,

        /// Filter as field:op:value (repeatable)
        #[arg(long, value_parser = parse_filter)]
        filter: Vec<Filter>,
    },

    /// Read one record by id
    Get {
        /// Resource to read from
        resource: ResourceKind,

        /// Record id
        id: String,
    },

    /// Active invoices with an amount due
    OpenInvoices,

    /// Move a customer's upcoming invoice due dates
    ShiftDates {
        /// Customer id
        customer_id: String,

        /// Days to move by; negative moves earlier
        #[arg(allow_hyphen_values = true)]
        days: i64,

        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Spread a customer's remaining balance over more monthly invoices
    Stretch {
        /// Customer id
        customer_id: String,

        /// Number of monthly invoices in the new schedule
        months: usize,

        /// Reference date (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Write a default config file
    InitConfig {
        /// Where to write it
        #[arg(default_value = crate::config::DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
}

/// Resource selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResourceKind {
    Invoices,
    Bills,
    Customers,
    Vendors,
    PaymentsMade,
    PaymentsReceived,
    Locations,
    Classes,
    Items,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one record per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse `field:op:value`
///
/// The value is read as JSON when it parses as JSON, so `amountDue:>:0`
/// compares against a number while `isActive:=:"1"` sends a string.
/// Anything that is not JSON is taken as a string.
pub fn parse_filter(s: &str) -> std::result::Result<Filter, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected field:op:value, got '{s}'"));
    };
    if field.is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    let op: Operator = op.parse().map_err(|e: crate::error::Error| e.to_string())?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));

    Ok(Filter {
        field: field.to_string(),
        op,
        value,
    })
}

/// Parse `field`, `field:asc` or `field:desc`
pub fn parse_sort(s: &str) -> std::result::Result<Sort, String> {
    let (field, asc) = match s.split_once(':') {
        None => (s, SortDirection::Ascending),
        Some((field, "asc")) => (field, SortDirection::Ascending),
        Some((field, "desc")) => (field, SortDirection::Descending),
        Some((_, other)) => return Err(format!("unknown sort direction '{other}'")),
    };
    if field.is_empty() {
        return Err(format!("missing field name in '{s}'"));
    }
    Ok(Sort {
        field: field.to_string(),
        asc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("amountDue:>:0", "amountDue", Operator::Gt, json!(0) ; "number")]
    #[test_case("isActive:=:\"1\"", "isActive", Operator::Eq, json!("1") ; "quoted string")]
    #[test_case("name:=:Ada Lovelace", "name", Operator::Eq, json!("Ada Lovelace") ; "bare string")]
    #[test_case("updatedTime:>:2024-01-01T00:00:00.000+0000", "updatedTime", Operator::Gt, json!("2024-01-01T00:00:00.000+0000") ; "value with colons")]
    #[test_case("id:in:[\"a\",\"b\"]", "id", Operator::In, json!(["a", "b"]) ; "list")]
    fn test_parse_filter(input: &str, field: &str, op: Operator, value: JsonValue) {
        let filter = parse_filter(input).unwrap();
        assert_eq!(
            filter,
            Filter {
                field: field.to_string(),
                op,
                value
            }
        );
    }

    #[test_case("amountDue" ; "no operator")]
    #[test_case("amountDue:>" ; "no value")]
    #[test_case(":=:1" ; "no field")]
    #[test_case("amountDue:~:1" ; "bad operator")]
    fn test_parse_filter_rejects(input: &str) {
        assert!(parse_filter(input).is_err());
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("amountDue").unwrap().asc, SortDirection::Ascending);
        assert_eq!(parse_sort("amountDue:desc").unwrap().asc, SortDirection::Descending);
        assert!(parse_sort("amountDue:sideways").is_err());
        assert!(parse_sort(":desc").is_err());
    }

    #[test]
    fn test_cli_parses_list() {
        let cli = Cli::try_parse_from([
            "bdc",
            "list",
            "invoices",
            "--filter",
            "amountDue:>:0",
            "--sort",
            "amountDue:desc",
            "--since",
            "2024-01-01T00:00:00Z",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::List {
                resource,
                filter,
                sort,
                since,
            } => {
                assert_eq!(resource, ResourceKind::Invoices);
                assert_eq!(filter.len(), 1);
                assert_eq!(sort[0].field, "amountDue");
                assert!(since.is_some());
            }
            other => panic!("Expected List, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_negative_shift() {
        let cli = Cli::try_parse_from(["bdc", "shift-dates", "cust-1", "-7", "--today", "2024-05-10"])
            .unwrap();
        match cli.command {
            Commands::ShiftDates { days, today, .. } => {
                assert_eq!(days, -7);
                assert_eq!(today, NaiveDate::from_ymd_opt(2024, 5, 10));
            }
            other => panic!("Expected ShiftDates, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_stretch() {
        let cli = Cli::try_parse_from(["bdc", "stretch", "cust-1", "6"]).unwrap();
        match cli.command {
            Commands::Stretch {
                customer_id,
                months,
                today,
            } => {
                assert_eq!(customer_id, "cust-1");
                assert_eq!(months, 6);
                assert_eq!(today, None);
            }
            other => panic!("Expected Stretch, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["bdc", "stretch", "cust-1", "-2"]).is_err());
    }
}
