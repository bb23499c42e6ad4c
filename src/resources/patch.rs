//! Typed partial updates
//!
//! The platform's update call replaces the whole object, so a partial
//! update reads the current object, overlays the fields that are set and
//! writes the result back.

use super::entities::{format_date, Invoice, InvoiceLineItem};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fields of an [`Invoice`] to change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicePatch {
    pub is_active: Option<bool>,
    pub customer_id: Option<String>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub amount_due: Option<f64>,
    pub description: Option<String>,
    pub location_id: Option<String>,
    pub actg_class_id: Option<String>,
    pub line_items: Option<Vec<InvoiceLineItem>>,
    pub is_to_be_emailed: Option<bool>,
}

impl InvoicePatch {
    /// An empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the due date
    #[must_use]
    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Move the invoice date
    #[must_use]
    pub fn invoice_date(mut self, date: NaiveDate) -> Self {
        self.invoice_date = Some(date);
        self
    }

    /// Replace the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace every line item
    #[must_use]
    pub fn line_items(mut self, items: Vec<InvoiceLineItem>) -> Self {
        self.line_items = Some(items);
        self
    }

    /// Activate or deactivate the invoice
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Copy the set fields onto `invoice`
    pub fn apply(&self, invoice: &mut Invoice) {
        if let Some(active) = self.is_active {
            invoice.is_active = if active { "1" } else { "0" }.to_string();
        }
        if let Some(ref v) = self.customer_id {
            invoice.customer_id.clone_from(v);
        }
        if let Some(ref v) = self.invoice_number {
            invoice.invoice_number.clone_from(v);
        }
        if let Some(date) = self.invoice_date {
            invoice.invoice_date = format_date(date);
        }
        if let Some(date) = self.due_date {
            invoice.due_date = format_date(date);
        }
        if let Some(v) = self.amount {
            invoice.amount = v;
        }
        if let Some(v) = self.amount_due {
            invoice.amount_due = v;
        }
        if let Some(ref v) = self.description {
            invoice.description.clone_from(v);
        }
        if let Some(ref v) = self.location_id {
            invoice.location_id.clone_from(v);
        }
        if let Some(ref v) = self.actg_class_id {
            invoice.actg_class_id.clone_from(v);
        }
        if let Some(ref items) = self.line_items {
            invoice.invoice_line_items.clone_from(items);
        }
        if let Some(v) = self.is_to_be_emailed {
            invoice.is_to_be_emailed = v;
        }
    }
}
