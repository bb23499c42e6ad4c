//! Filter and sort parameters for list queries
//!
//! Parameters are passed through the fetch engine unmodified and land in
//! the `filters` and `sort` members of the request's JSON `data` field.
//! Not every field can be filtered; the platform rejects unsupported
//! filters with an application error.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison operator accepted by list filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "nin")]
    NotIn,
}

impl Operator {
    /// Wire representation of the operator
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Ne => "!=",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::In => "in",
            Operator::NotIn => "nin",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(Operator::Eq),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            "!=" => Ok(Operator::Ne),
            "<=" => Ok(Operator::Le),
            ">=" => Ok(Operator::Ge),
            "in" => Ok(Operator::In),
            "nin" => Ok(Operator::NotIn),
            other => Err(Error::invalid_value(
                "operator",
                format!("'{other}' is not one of = < > != <= >= in nin"),
            )),
        }
    }
}

/// A single filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: JsonValue,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// A single sort key, serialized as `{"field": ..., "asc": 1|0}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(with = "asc_flag")]
    pub asc: SortDirection,
}

mod asc_flag {
    use super::SortDirection;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dir: &SortDirection, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(match dir {
            SortDirection::Ascending => 1,
            SortDirection::Descending => 0,
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SortDirection, D::Error> {
        Ok(match u8::deserialize(d)? {
            0 => SortDirection::Descending,
            _ => SortDirection::Ascending,
        })
    }
}

/// Filter and sort criteria for one list query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default, rename = "sort")]
    pub sorts: Vec<Sort>,
}

impl Parameters {
    /// Create empty parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, op: Operator, value: impl Into<JsonValue>) -> Self {
        self.add_filter(field, op, value);
        self
    }

    /// Add a sort key
    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.add_sort(field, direction);
        self
    }

    /// Add a filter in place
    pub fn add_filter(&mut self, field: impl Into<String>, op: Operator, value: impl Into<JsonValue>) {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
    }

    /// Add a sort key in place
    pub fn add_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.sorts.push(Sort {
            field: field.into(),
            asc: direction,
        });
    }

    /// Check whether any criteria are set
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.sorts.is_empty()
    }
}
