//! Shared context passed to workflow actions
//!
//! An action runs entirely inside one write transaction. The engine owns
//! the transaction, permission gate and activity persistence; the action
//! validates preconditions, mutates records and describes what to log and
//! render through [`ActionOutcome`].

use chrono::NaiveDate;
use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::models::{ActivityAction, Booking, Invoice, Quote, User};

use super::error::{WorkflowError, WorkflowResult};
use super::storage::WorkflowStorage;
use crate::render::RenderRequest;

/// Who is performing the operation.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    /// `None` for system-initiated operations (sweeps, render retries).
    pub user: Option<User>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Actor {
    pub fn system() -> Self {
        Self::default()
    }

    pub fn of_user(user: User) -> Self {
        Self {
            user: Some(user),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Activity entry described by an action; the engine assigns the sequence
/// number and actor fields before persisting.
#[derive(Debug, Clone)]
pub struct ActivityDraft {
    pub action: ActivityAction,
    pub description: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl ActivityDraft {
    pub fn new(action: ActivityAction, description: impl Into<String>) -> Self {
        Self {
            action,
            description: description.into(),
            old_value: None,
            new_value: None,
        }
    }

    pub fn with_change(
        mut self,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        self.old_value = Some(old_value.into());
        self.new_value = Some(new_value.into());
        self
    }
}

/// Result of a successful action.
///
/// An idempotent no-op returns the unchanged booking with an empty `log`;
/// the engine skips activity persistence and rendering in that case.
#[derive(Debug)]
pub struct ActionOutcome {
    pub booking: Booking,
    pub quote: Option<Quote>,
    pub invoice: Option<Invoice>,
    pub log: Vec<ActivityDraft>,
    /// Artifact to produce after commit. Renderer failure never fails the
    /// transition; the request lands on the deferred queue instead.
    pub render: Option<RenderRequest>,
}

impl ActionOutcome {
    pub fn no_op(booking: Booking) -> Self {
        Self {
            booking,
            quote: None,
            invoice: None,
            log: Vec::new(),
            render: None,
        }
    }

    pub fn is_no_op(&self) -> bool {
        self.log.is_empty()
    }
}

/// Per-operation context: the open transaction plus the instant and
/// business-calendar date the operation runs at.
pub struct ActionContext<'a> {
    pub storage: &'a WorkflowStorage,
    pub txn: &'a WriteTransaction,
    pub actor: &'a Actor,
    /// Unix millis the operation started at.
    pub now_millis: i64,
    /// Calendar date of `now_millis` in the business timezone.
    pub today: NaiveDate,
    pub tz: Tz,
}

impl ActionContext<'_> {
    pub fn load_booking(&self, id: i64) -> WorkflowResult<Booking> {
        self.storage
            .booking_txn(self.txn, id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("booking {id}")))
    }

    /// Write back a booking under the optimistic lock. `expected_updated_at`
    /// is the `updated_at` the caller loaded; a mismatch means another
    /// writer got there first.
    pub fn store_booking(
        &self,
        booking: &mut Booking,
        expected_updated_at: i64,
    ) -> WorkflowResult<()> {
        self.storage
            .update_booking_cas(self.txn, booking, expected_updated_at, self.now_millis)?;
        Ok(())
    }

    pub fn load_quote(&self, id: i64) -> WorkflowResult<Quote> {
        self.storage
            .quote_txn(self.txn, id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("quote {id}")))
    }

    pub fn store_quote(&self, quote: &mut Quote, expected_updated_at: i64) -> WorkflowResult<()> {
        self.storage
            .update_quote_cas(self.txn, quote, expected_updated_at, self.now_millis)?;
        Ok(())
    }

    pub fn load_invoice(&self, id: i64) -> WorkflowResult<Invoice> {
        self.storage
            .invoice_txn(self.txn, id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("invoice {id}")))
    }

    pub fn store_invoice(
        &self,
        invoice: &mut Invoice,
        expected_updated_at: i64,
    ) -> WorkflowResult<()> {
        self.storage
            .update_invoice_cas(self.txn, invoice, expected_updated_at, self.now_millis)?;
        Ok(())
    }
}
