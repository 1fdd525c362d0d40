//! Activity log types
//!
//! Append-only audit trail of workflow transitions and auditable edits,
//! indexed by booking. Entries are never updated or deleted; the
//! denormalized timestamps on the booking are convenience mirrors and must
//! not be used for audit reconstruction.

use serde::{Deserialize, Serialize};

/// Auditable action type (enum, not free text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    // ═══ Booking lifecycle ═══
    BookingCreated,
    BookingConfirmed,
    BookingCancelled,
    BookingCompleted,
    BookingUpdated,

    // ═══ Documents ═══
    QuoteCreated,
    QuoteSent,
    QuoteAccepted,
    QuoteConverted,
    InvoiceCreated,

    // ═══ Money ═══
    PaymentAdded,
    MarkedPaid,

    // ═══ Fulfilment ═══
    VoucherIssued,

    // ═══ Public sharing ═══
    ShareTokenIssued,
    ShareTokenLocked,
    ShareTokenReset,
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One immutable activity log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Globally increasing sequence number (unique).
    pub id: u64,
    pub booking_id: i64,
    /// `None` for system-initiated actions (auto-completion sweeps etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub action: ActivityAction,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Unix millis.
    pub created_at: i64,
}
