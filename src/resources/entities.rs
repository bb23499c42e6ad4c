//! Entity types
//!
//! Only the fields callers work with are modelled; anything else the
//! platform returns is ignored on decode. Timestamps stay strings in the
//! platform's own formats (see [`crate::types::TIME_FORMAT`] and
//! [`crate::types::DATE_FORMAT`]).

use super::Entity;
use crate::error::{Error, Result};
use crate::types::DATE_FORMAT;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Active flag value used by the platform
pub const ACTIVE: &str = "1";

/// Parse a platform date such as `2019-01-01`
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| Error::decode(format!("Invalid {field} '{value}': {e}")))
}

/// Format a date the way the platform expects
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

// ============================================================================
// Receivables
// ============================================================================

/// Customer invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_time: String,
    pub entity: String,
    pub is_active: String,
    pub customer_id: String,
    pub invoice_number: String,
    pub invoice_date: String,
    pub due_date: String,
    pub amount: f64,
    pub amount_due: f64,
    pub payment_status: String,
    pub description: String,
    pub location_id: String,
    pub actg_class_id: String,
    pub invoice_line_items: Vec<InvoiceLineItem>,
    pub is_to_be_emailed: bool,
}

impl Invoice {
    /// Build a new invoice dated and due on `due_date`
    ///
    /// The amount and amount due are the sum of the line items.
    pub fn new(
        customer_id: impl Into<String>,
        invoice_number: impl Into<String>,
        due_date: NaiveDate,
        line_items: Vec<InvoiceLineItem>,
    ) -> Self {
        let amount = line_items.iter().map(|item| item.amount).sum();
        let date = format_date(due_date);
        Self {
            entity: "Invoice".to_string(),
            is_active: ACTIVE.to_string(),
            customer_id: customer_id.into(),
            invoice_number: invoice_number.into(),
            invoice_date: date.clone(),
            due_date: date,
            amount,
            amount_due: amount,
            invoice_line_items: line_items,
            is_to_be_emailed: true,
            ..Self::default()
        }
    }

    /// Whether the invoice is active
    pub fn is_active(&self) -> bool {
        self.is_active == ACTIVE
    }

    /// Parsed invoice date
    pub fn invoice_date(&self) -> Result<NaiveDate> {
        parse_date("invoiceDate", &self.invoice_date)
    }

    /// Parsed due date
    pub fn due_date(&self) -> Result<NaiveDate> {
        parse_date("dueDate", &self.due_date)
    }
}

impl Entity for Invoice {
    const SUFFIX: &'static str = "Invoice.json";
    const NAME: &'static str = "invoice";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Line item of an invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceLineItem {
    pub entity: String,
    pub item_id: String,
    pub quantity: i64,
    pub amount: f64,
    pub price: f64,
    pub actg_class_id: String,
    pub location_id: String,
    pub description: String,
}

impl InvoiceLineItem {
    /// A single-quantity line item
    pub fn new(item_id: impl Into<String>, amount: f64, description: impl Into<String>) -> Self {
        Self {
            entity: "InvoiceLineItem".to_string(),
            item_id: item_id.into(),
            quantity: 1,
            amount,
            price: amount,
            description: description.into(),
            ..Self::default()
        }
    }
}

/// Customer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_time: String,
    pub entity: String,
    pub is_active: String,
    pub name: String,
    #[serde(rename = "accNumber")]
    pub account_number: String,
    pub email: String,
}

impl Entity for Customer {
    const SUFFIX: &'static str = "Customer.json";
    const NAME: &'static str = "customer";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Payment received from a customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentReceived {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_time: String,
    pub entity: String,
    pub customer_id: String,
    /// 0 paid, 1 void, 2 scheduled, 3 cancelled
    pub status: String,
    pub payment_date: String,
    pub deposit_to_account_id: String,
    pub is_online: bool,
    /// 0 cash, 1 check, 2 credit card, 3 ACH, 4 PayPal, 5 other
    pub payment_type: String,
    pub amount: f64,
    pub description: String,
    pub ref_number: String,
    pub conv_fee_amount: f64,
    pub invoice_pays: Vec<InvoicePay>,
}

impl Entity for PaymentReceived {
    const SUFFIX: &'static str = "ReceivedPay.json";
    const NAME: &'static str = "payment received";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Share of a received payment applied to one invoice
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoicePay {
    pub entity: String,
    pub id: String,
    pub invoice_id: String,
    pub amount: f64,
    pub description: String,
    pub created_time: String,
    pub updated_time: String,
    /// 0 paid, 1 void, 2 scheduled, 3 cancelled, 4 initiated
    pub status: String,
}

// ============================================================================
// Payables
// ============================================================================

/// Vendor bill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bill {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_time: String,
    pub entity: String,
    pub is_active: String,
    pub vendor_id: String,
    pub invoice_number: String,
    pub invoice_date: String,
    pub due_date: String,
    pub description: String,
    pub bill_line_items: Vec<BillLineItem>,
}

impl Entity for Bill {
    const SUFFIX: &'static str = "Bill.json";
    const NAME: &'static str = "bill";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Line item of a bill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillLineItem {
    pub entity: String,
    pub amount: f64,
    pub item_id: String,
    pub quantity: i64,
    pub unit_price: f64,
    #[serde(rename = "actgBillId")]
    pub bill_id: String,
    pub location_id: String,
    pub description: String,
}

/// Vendor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Vendor {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_time: String,
    pub entity: String,
    pub is_active: String,
    pub name: String,
    #[serde(rename = "accNumber")]
    pub account_number: String,
    pub email: String,
}

impl Entity for Vendor {
    const SUFFIX: &'static str = "Vendor.json";
    const NAME: &'static str = "vendor";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Payment made against a bill
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentMade {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub created_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub updated_time: String,
    pub entity: String,
    pub bill_id: String,
    pub name: String,
    pub payment_status: String,
    pub amount: f64,
    pub description: String,
    pub process_date: String,
}

impl Entity for PaymentMade {
    const SUFFIX: &'static str = "BillPay.json";
    const NAME: &'static str = "payment made";

    fn id(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// Lists
// ============================================================================

macro_rules! named_list_entity {
    ($(#[$doc:meta])* $name:ident, $suffix:literal, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase", default)]
        pub struct $name {
            #[serde(skip_serializing_if = "String::is_empty")]
            pub id: String,
            #[serde(skip_serializing_if = "String::is_empty")]
            pub created_time: String,
            #[serde(skip_serializing_if = "String::is_empty")]
            pub updated_time: String,
            pub entity: String,
            pub is_active: String,
            pub name: String,
            pub short_name: String,
            pub description: String,
        }

        impl Entity for $name {
            const SUFFIX: &'static str = $suffix;
            const NAME: &'static str = $label;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

named_list_entity!(
    /// Business location
    Location,
    "Location.json",
    "location"
);

named_list_entity!(
    /// Accounting class
    ActgClass,
    "ActgClass.json",
    "class"
);

named_list_entity!(
    /// Product or service item
    Item,
    "Item.json",
    "item"
);
