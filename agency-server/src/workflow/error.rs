//! Workflow error taxonomy
//!
//! Business-rule errors propagate verbatim; infrastructure errors
//! (storage, renderer) are translated at the engine boundary. Nothing is
//! silently swallowed except the idempotent-transition no-op.

use shared::models::BookingStatus;
use thiserror::Error;

use super::storage::StorageError;
use crate::share::TokenError;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Permission denied. Never logged as an activity; nothing is mutated.
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// State-machine violation; carries both sides for the caller.
    #[error("Invalid transition: {from} -> {requested}")]
    InvalidTransition {
        from: BookingStatus,
        requested: BookingStatus,
    },

    /// Document-level state violation (quote/invoice status machine).
    #[error("Invalid document state: {0}")]
    InvalidDocumentState(String),

    /// Optimistic lock failure; reload and retry.
    #[error("Concurrent update detected, reload and retry")]
    ConcurrentUpdate,

    /// The booking's confirmation deadline passed before `confirm`.
    #[error("Booking time limit elapsed")]
    TimeLimitElapsed,

    /// Payment exceeds the outstanding balance. Rejected, not clamped.
    #[error("Payment of {amount} exceeds balance due {balance_due}")]
    Overpayment {
        amount: rust_decimal::Decimal,
        balance_due: rust_decimal::Decimal,
    },

    /// Identifier space full for the current period. Operational alert.
    #[error("Identifier allocation exhausted for stream {0}")]
    AllocationExhausted(String),

    /// Share-token verification failure. Externally rendered as 404 so
    /// booking existence is not revealed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Request deadline exceeded; the transaction was rolled back.
    #[error("Operation timed out")]
    Timeout,

    /// Renderer collaborator failed; the transition still commits and the
    /// artifact is queued for a later retry.
    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for WorkflowError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::StaleWrite { .. } => WorkflowError::ConcurrentUpdate,
            StorageError::NotFound(what) => WorkflowError::NotFound(what),
            other => WorkflowError::Storage(other),
        }
    }
}
