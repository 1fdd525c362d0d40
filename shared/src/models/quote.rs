//! Quote entity
//!
//! A priced offer snapshotted from a booking when it moves
//! `confirmed → quoted`. Monetary fields and line items freeze the moment
//! the quote leaves `draft`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Days a quote stays valid after issuance.
pub const QUOTE_VALID_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Expired,
    Converted,
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Expired => "expired",
            QuoteStatus::Converted => "converted",
        };
        f.write_str(s)
    }
}

/// One line on a quote or invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Always `quantity * unit_price`; stored for list views.
    pub total_amount: Decimal,
    pub sort_order: i32,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: i32, unit_price: Decimal, sort_order: i32) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            total_amount: Decimal::from(quantity) * unit_price,
            sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    /// `QT` + YYMM + 4-digit serial, unique and monotonic per period.
    pub quote_number: String,
    pub booking_id: i64,
    pub quote_date: NaiveDate,
    /// Defaults to `quote_date + 30 days`.
    pub valid_until: NaiveDate,

    pub subtotal: Decimal,
    /// Percent.
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    /// `subtotal - discount_amount + tax_amount`.
    pub total_amount: Decimal,

    pub status: QuoteStatus,

    // Public sharing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
    pub is_public: bool,
    /// Unix seconds; public page stops resolving past this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_expiry: Option<i64>,

    pub line_items: Vec<LineItem>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Quote {
    /// Whether the quote has lapsed as of the given business date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.valid_until
    }

    /// Days remaining before expiry (negative once lapsed).
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.valid_until - today).num_days()
    }

    /// Monetary fields may only change while the quote is a draft.
    pub fn is_frozen(&self) -> bool {
        self.status != QuoteStatus::Draft
    }
}
