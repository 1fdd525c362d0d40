//! Invoice entity
//!
//! The billable document derived from a quote (or created directly at
//! mark-paid time). Payments are append-only; the invoice itself is never
//! deleted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::LineItem;

/// Days until an invoice falls due after issuance.
pub const INVOICE_DUE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// A recorded payment against an invoice. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePayment {
    pub id: i64,
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub payment_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Unix millis when the payment row was inserted.
    pub recorded_at: i64,
}

/// Input for recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub payment_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    /// `INV` + YYMM + 4-digit serial, unique and monotonic per period.
    pub invoice_number: String,
    pub booking_id: i64,
    /// Set when the invoice was converted from a quote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<i64>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,

    pub status: InvoiceStatus,
    pub payment_status: PaymentStatus,

    pub subtotal: Decimal,
    /// Percent.
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    /// Always `total_amount - paid_amount`.
    pub balance_due: Decimal,

    pub line_items: Vec<LineItem>,
    pub payments: Vec<InvoicePayment>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Invoice {
    /// Recompute `balance_due` and `payment_status` from `paid_amount`.
    ///
    /// `payment_status` rule: paid ⇔ paid_amount >= total_amount,
    /// partial ⇔ 0 < paid_amount < total_amount, unpaid ⇔ paid_amount = 0.
    pub fn recalculate(&mut self) {
        self.balance_due = self.total_amount - self.paid_amount;
        self.payment_status = if self.paid_amount >= self.total_amount {
            PaymentStatus::Paid
        } else if self.paid_amount > Decimal::ZERO {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Unpaid
        };
        if self.payment_status == PaymentStatus::Paid {
            self.status = InvoiceStatus::Paid;
        }
    }

    pub fn is_fully_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}
