//! Booking aggregate
//!
//! The root entity for one customer engagement. Carries the workflow
//! status, per-transition timestamps, denormalized mirrors of the child
//! quote/invoice (for list views without joins), and opaque content the
//! back office edits freely (guest list, products, daily services).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{InvoiceStatus, QuoteStatus};

/// Booking workflow status.
///
/// `Cancelled` sits outside the forward progression; use
/// [`BookingStatus::has_reached`] for "status >= X" checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Draft,
    Confirmed,
    Quoted,
    Invoiced,
    Paid,
    Vouchered,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Position in the forward progression; `None` for `Cancelled`.
    fn ordinal(self) -> Option<u8> {
        match self {
            BookingStatus::Draft => Some(0),
            BookingStatus::Confirmed => Some(1),
            BookingStatus::Quoted => Some(2),
            BookingStatus::Invoiced => Some(3),
            BookingStatus::Paid => Some(4),
            BookingStatus::Vouchered => Some(5),
            BookingStatus::Completed => Some(6),
            BookingStatus::Cancelled => None,
        }
    }

    /// True if this status is at or past `other` on the forward path.
    pub fn has_reached(self, other: BookingStatus) -> bool {
        match (self.ordinal(), other.ordinal()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BookingStatus::Draft => "draft",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Quoted => "quoted",
            BookingStatus::Invoiced => "invoiced",
            BookingStatus::Paid => "paid",
            BookingStatus::Vouchered => "vouchered",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One sellable line on a booking (snapshotted into quote line items).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl ProductLine {
    pub fn line_total(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// Guest on the booking (free-form name plus optional passport number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_no: Option<String>,
}

/// One scheduled service day (transfer, tour, hotel night...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_by: Option<String>,
    pub service_type: String,
    pub description: String,
}

/// Booking entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    /// Human-readable external reference: `BK` + YYMMDD + 4 base-36 chars.
    pub booking_reference: String,

    // Foreign references
    pub customer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<i64>,

    pub status: BookingStatus,

    // Workflow timestamps (Unix millis): set once on first transition,
    // never cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoiced_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vouchered_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,

    // Commercial fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_type: Option<String>,
    pub total_amount: Decimal,
    /// ISO currency code; the agency trades in THB.
    pub currency: String,
    /// Tax rate in percent applied when the quote is issued.
    pub tax_rate: Decimal,
    pub discount_amount: Decimal,
    /// Deadline for confirmation (Unix millis). Mandatory.
    pub time_limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,

    // Denormalized mirrors of child documents. The workflow engine is the
    // single writer; any other code path mutating these is a defect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_status: Option<QuoteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_status: Option<InvoiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_amount: Option<Decimal>,
    pub is_paid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_paid_date: Option<NaiveDate>,

    /// Tokens issued before this instant (Unix seconds) are rejected.
    /// Set by the lock operation, cleared by reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_locked_at: Option<i64>,

    // Opaque content, editable at any pre-cancellation stage; never copied
    // back into issued documents.
    #[serde(default)]
    pub guest_list: Vec<GuestRecord>,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    #[serde(default)]
    pub daily_services: Vec<DailyService>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_info: Option<serde_json::Value>,
    #[serde(default)]
    pub voucher_images: Vec<String>,
    #[serde(default)]
    pub voucher_album_ids: Vec<i64>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Booking {
    /// Sum of `quantity * unit_price` over all product lines.
    pub fn products_total(&self) -> Decimal {
        self.products
            .iter()
            .map(ProductLine::line_total)
            .sum::<Decimal>()
    }
}

/// Input for creating a booking (draft).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    pub customer_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_type: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    /// Confirmation deadline (Unix millis). Mandatory.
    pub time_limit: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_date: Option<NaiveDate>,
    #[serde(default)]
    pub guest_list: Vec<GuestRecord>,
    #[serde(default)]
    pub products: Vec<ProductLine>,
    #[serde(default)]
    pub daily_services: Vec<DailyService>,
}
