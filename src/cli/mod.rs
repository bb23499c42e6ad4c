//! CLI module
//!
//! Command-line interface for the `bdc` binary.
//!
//! # Commands
//!
//! - `list` - Print every record of a resource
//! - `count` - Print the number of pages a listing would fetch
//! - `get` - Print one record
//! - `open-invoices` - Active invoices with an amount due
//! - `shift-dates` - Move a customer's invoice schedule
//! - `init-config` - Write a default config file

mod commands;
mod runner;

pub use commands::{parse_filter, parse_sort, Cli, Commands, OutputFormat, ResourceKind};
pub use runner::Runner;
