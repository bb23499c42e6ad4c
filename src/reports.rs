//! Reports and invoice workflows

use crate::client::Client;
use crate::error::{Error, Result};
use crate::params::{Operator, Parameters, SortDirection};
use crate::resources::{Invoice, InvoiceLineItem, InvoicePatch, ACTIVE};
use chrono::{Days, Months, NaiveDate};
use tracing::{info, warn};

/// Criteria of the open invoices report
pub fn open_invoice_params() -> Parameters {
    Parameters::new()
        .filter("isActive", Operator::Eq, ACTIVE)
        .filter("amountDue", Operator::Gt, 0)
        .sort("amountDue", SortDirection::Ascending)
}

/// Whether an invoice can still be rescheduled on `today`
///
/// The invoice must be active, have something due, and be dated no earlier
/// than yesterday. Yesterday is allowed to absorb time zone differences.
pub fn is_editable(invoice: &Invoice, today: NaiveDate) -> Result<bool> {
    if !invoice.is_active() || invoice.amount_due <= 0.0 {
        return Ok(false);
    }
    let earliest = today - Days::new(1);
    Ok(invoice.invoice_date()? >= earliest)
}

/// Editable invoices sorted by invoice date
pub fn editable_invoices(invoices: Vec<Invoice>, today: NaiveDate) -> Result<Vec<Invoice>> {
    let mut editable = Vec::new();
    for invoice in invoices {
        if is_editable(&invoice, today)? {
            editable.push(invoice);
        }
    }
    editable.sort_by(|a, b| a.invoice_date.cmp(&b.invoice_date));
    Ok(editable)
}

fn shift(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    shifted.ok_or_else(|| Error::workflow(format!("Cannot move {date} by {days} days")))
}

/// Outcome of stretching an invoice schedule
#[derive(Debug, Clone, PartialEq)]
pub struct StretchSummary {
    /// Existing invoices rewritten at the new price
    pub updated: usize,
    /// Invoices added to reach the new number of months
    pub created: Vec<Invoice>,
    /// Price of each invoice in the stretched schedule
    pub amount_per_invoice: f64,
}

/// `total_due` split evenly over `months`, rounded to cents
fn spread(total_due: f64, months: usize) -> f64 {
    (total_due / months as f64 * 100.0).round() / 100.0
}

fn repriced(item: &InvoiceLineItem, price: f64) -> InvoiceLineItem {
    InvoiceLineItem {
        price,
        amount: price * item.quantity.max(1) as f64,
        ..item.clone()
    }
}

/// `count` invoices following `anchor`, one month apart
fn extension_invoices(
    anchor: &Invoice,
    item: &InvoiceLineItem,
    count: usize,
) -> Result<Vec<Invoice>> {
    let anchor_due = anchor.due_date()?;
    (1..=count)
        .map(|i| {
            let due = u32::try_from(i)
                .ok()
                .and_then(|months| anchor_due.checked_add_months(Months::new(months)))
                .ok_or_else(|| {
                    Error::workflow(format!("Cannot schedule {i} months after {anchor_due}"))
                })?;
            let mut invoice = Invoice::new(
                anchor.customer_id.clone(),
                format!("{}_ext{i}", anchor.invoice_number),
                due,
                vec![item.clone()],
            );
            invoice.actg_class_id.clone_from(&anchor.actg_class_id);
            invoice.location_id.clone_from(&anchor.location_id);
            Ok(invoice)
        })
        .collect()
}

impl Client {
    /// Active invoices with an amount due, smallest balance first
    pub async fn open_invoices(&self) -> Result<Vec<Invoice>> {
        self.invoices()
            .all(open_invoice_params())
            .await
            .map_err(|e| Error::workflow(format!("Unable to complete open invoices report: {e}")))
    }

    /// Move the due date of every editable invoice of a customer by `days`
    ///
    /// Negative `days` move the schedule earlier. Invoices are updated in
    /// invoice date order and the first failed update stops the run.
    /// Returns the number of invoices updated.
    pub async fn shift_invoice_dates(
        &self,
        customer_id: &str,
        days: i64,
        today: NaiveDate,
    ) -> Result<usize> {
        let invoices = self.customer_invoices(customer_id).await.map_err(|e| {
            Error::workflow(format!(
                "Unable to get invoices for customer {customer_id}: {e}"
            ))
        })?;

        let editable = editable_invoices(invoices, today)?;
        if editable.is_empty() {
            return Err(Error::workflow(format!(
                "No editable invoices for customer {customer_id}; \
                 they may be inactive, paid, or in the past"
            )));
        }

        for (updated, invoice) in editable.iter().enumerate() {
            let patch = InvoicePatch::new().due_date(shift(invoice.due_date()?, days)?);
            if let Err(e) = self.invoices().patch(&invoice.id, &patch).await {
                warn!(invoice = %invoice.id, "Invoice update failed: {}", e);
                return Err(if updated == 0 {
                    Error::workflow(format!("Unable to modify any invoice dates: {e}"))
                } else {
                    Error::workflow(format!(
                        "Unable to modify additional invoices after {updated} updates: {e}"
                    ))
                });
            }
        }

        info!(
            customer = customer_id,
            days,
            invoices = editable.len(),
            "Shifted invoice schedule"
        );
        Ok(editable.len())
    }

    /// Spread a customer's remaining balance over `new_months` monthly invoices
    ///
    /// Only editable invoices with a single line item take part. Each of them
    /// is rewritten with the anchor's line item at the new price, the anchor
    /// being the one with the latest invoice date. Invoices numbered
    /// `<anchor number>_ext<i>` are then created, each due one month after
    /// the previous one, until the schedule has `new_months` invoices.
    pub async fn stretch_invoice_schedule(
        &self,
        customer_id: &str,
        new_months: usize,
        today: NaiveDate,
    ) -> Result<StretchSummary> {
        let fail = |message: String| {
            Error::workflow(format!("Unable to stretch invoice schedule: {message}"))
        };

        let invoices = self
            .customer_invoices(customer_id)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let schedule: Vec<Invoice> = editable_invoices(invoices, today)?
            .into_iter()
            .filter(|invoice| invoice.invoice_line_items.len() == 1)
            .collect();

        if schedule.len() >= new_months {
            return Err(fail(format!(
                "the new number of months ({new_months}) must be greater than \
                 the current number of editable invoices ({})",
                schedule.len()
            )));
        }
        let Some(anchor) = schedule.last() else {
            return Err(fail(
                "no editable invoices with a single line item; \
                 they may have several line items or be in the past"
                    .to_string(),
            ));
        };

        let total_due: f64 = schedule.iter().map(|invoice| invoice.amount_due).sum();
        let price = spread(total_due, new_months);
        let item = repriced(&anchor.invoice_line_items[0], price);
        let extensions = extension_invoices(anchor, &item, new_months - schedule.len())?;

        for (updated, invoice) in schedule.iter().enumerate() {
            let patch = InvoicePatch::new().line_items(vec![item.clone()]);
            if let Err(e) = self.invoices().patch(&invoice.id, &patch).await {
                warn!(invoice = %invoice.id, "Invoice update failed: {}", e);
                return Err(if updated == 0 {
                    fail(format!("unable to update any invoices: {e}"))
                } else {
                    fail(format!(
                        "unable to update additional invoices after {updated} updates: {e}"
                    ))
                });
            }
        }

        let mut created = Vec::with_capacity(extensions.len());
        for invoice in &extensions {
            match self.invoices().create(invoice).await {
                Ok(stored) => created.push(stored),
                Err(e) => {
                    warn!(number = %invoice.invoice_number, "Invoice creation failed: {}", e);
                    return Err(if created.is_empty() {
                        fail(format!("unable to create any new invoices: {e}"))
                    } else {
                        fail(format!(
                            "unable to create additional invoices after {} were created: {e}",
                            created.len()
                        ))
                    });
                }
            }
        }

        info!(
            customer = customer_id,
            months = new_months,
            updated = schedule.len(),
            created = created.len(),
            amount_per_invoice = price,
            "Stretched invoice schedule"
        );
        Ok(StretchSummary {
            updated: schedule.len(),
            created,
            amount_per_invoice: price,
        })
    }

    async fn customer_invoices(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        let params = Parameters::new().filter("customerId", Operator::Eq, customer_id);
        self.invoices().all(params).await
    }
}
