//! Workflow engine
//!
//! Orchestrates every booking operation: permission gate, one write
//! transaction per operation, activity persistence, post-commit artifact
//! rendering with a deferred queue, and the share-token operations.
//!
//! A system actor (no user attached) bypasses the permission gate; it is
//! used by the auto-completion sweep and the render retry worker.

use std::sync::Arc;

use chrono::Days;
use chrono_tz::Tz;
use shared::models::{
    ActivityAction, ActivityEntry, Booking, BookingStatus, Invoice, NewBooking, PaymentInput,
    Quote, Role,
};

use crate::activity::ActivityLog;
use crate::auth::PermissionEvaluator;
use crate::config::Config;
use crate::render::{
    ArtifactHandle, DocumentKind, DocumentRenderer, DocumentSnapshot, PendingRender,
    RenderRequest,
};
use crate::share::{TokenCodec, TokenError};
use crate::utils::time::{date_start_secs, local_date, Clock};

use super::actions::{
    AcceptQuoteAction, AddPaymentAction, ApplyInvoiceAction, CancelAction, CompleteAction,
    ConfirmAction, CreateBookingAction, MarkPaidAction, QuoteAction, SendQuoteAction,
    VoucherAction, WorkflowAction,
};
use super::context::{ActionContext, ActionOutcome, ActivityDraft, Actor};
use super::error::{WorkflowError, WorkflowResult};
use super::storage::WorkflowStorage;

const SECS_PER_DAY: i64 = 24 * 3600;

/// Public access window granted when a quote is sent.
const SEND_QUOTE_SHARE_DAYS: i64 = 30;

/// A minted share link.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareGrant {
    pub token: String,
    pub url: String,
    /// Unix seconds.
    pub expires_at: i64,
}

/// Permission requirement for one operation.
enum Gate {
    /// `module.action` must be granted.
    Module(&'static str, &'static str),
    /// Booking mutation with "own" semantics.
    EditBooking(i64),
    /// financial.edit plus an Administrator or Manager role.
    MarkPaid,
}

#[derive(Clone)]
pub struct WorkflowEngine {
    storage: WorkflowStorage,
    activity: ActivityLog,
    permissions: PermissionEvaluator,
    codec: TokenCodec,
    renderer: Arc<dyn DocumentRenderer>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    share_ttl_days: i64,
    public_base_url: String,
    request_timeout_ms: u64,
}

impl WorkflowEngine {
    pub fn new(
        storage: WorkflowStorage,
        renderer: Arc<dyn DocumentRenderer>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        Self {
            activity: ActivityLog::new(storage.clone()),
            permissions: PermissionEvaluator::new(storage.clone()),
            codec: TokenCodec::new(&config.share_token_secret),
            storage,
            renderer,
            clock,
            tz: config.timezone,
            share_ttl_days: config.share_token_ttl_days,
            public_base_url: config.public_base_url.clone(),
            request_timeout_ms: config.request_timeout_ms,
        }
    }

    // ========== Lifecycle operations ==========

    pub fn create_booking(
        &self,
        actor: &Actor,
        input: NewBooking,
    ) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::Module("bookings", "create"))?;
        self.run(actor, &CreateBookingAction { input })
    }

    pub fn confirm(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::EditBooking(booking_id))?;
        self.run(actor, &ConfirmAction { booking_id })
    }

    pub fn quote(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::Module("quotes", "create"))?;
        self.run(actor, &QuoteAction { booking_id })
    }

    /// Send the quote to the customer; grants a 30-day public share
    /// window on the quote document.
    pub fn send_quote(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_quote_edit(actor)?;
        let now_secs = self.clock.now_secs();
        let public_expiry = now_secs + SEND_QUOTE_SHARE_DAYS * SECS_PER_DAY;
        let share_token = self.codec.mint(booking_id, now_secs, public_expiry);
        self.run(
            actor,
            &SendQuoteAction {
                booking_id,
                share_token,
                public_expiry,
            },
        )
    }

    pub fn accept_quote(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_quote_edit(actor)?;
        self.run(actor, &AcceptQuoteAction { booking_id })
    }

    pub fn apply_invoice(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_quote_edit(actor)?;
        self.run(actor, &ApplyInvoiceAction { booking_id })
    }

    pub fn add_payment(
        &self,
        actor: &Actor,
        invoice_id: i64,
        payment: PaymentInput,
    ) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::Module("financial", "edit"))?;
        self.run(actor, &AddPaymentAction { invoice_id, payment })
    }

    pub fn mark_paid(
        &self,
        actor: &Actor,
        booking_id: i64,
        payment_method: String,
        payment_date: chrono::NaiveDate,
        reference: Option<String>,
    ) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::MarkPaid)?;
        self.run(
            actor,
            &MarkPaidAction {
                booking_id,
                payment_method,
                payment_date,
                reference,
            },
        )
    }

    pub fn voucher(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::Module("vouchers", "create"))?;
        self.run(actor, &VoucherAction { booking_id })
    }

    pub fn complete(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::Module("bookings", "edit_all"))?;
        self.run(actor, &CompleteAction { booking_id })
    }

    pub fn cancel(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ActionOutcome> {
        self.check_gate(actor, Gate::Module("bookings", "delete"))?;
        self.run(actor, &CancelAction { booking_id })
    }

    /// Complete every vouchered booking whose travel period has ended.
    /// Returns the number of bookings completed. Driven by a periodic
    /// background job; runs as the system actor.
    pub fn complete_due(&self) -> WorkflowResult<usize> {
        let today = local_date(self.clock.now_millis(), self.tz);
        let actor = Actor::system();
        let mut completed = 0;
        for booking in self.storage.list_bookings()? {
            if booking.status != BookingStatus::Vouchered {
                continue;
            }
            let due = booking
                .return_date
                .or(booking.departure_date)
                .is_some_and(|end| end <= today);
            if !due {
                continue;
            }
            match self.run(&actor, &CompleteAction { booking_id: booking.id }) {
                Ok(_) => completed += 1,
                Err(e) => {
                    tracing::warn!(booking_id = booking.id, error = %e, "auto-completion failed");
                }
            }
        }
        Ok(completed)
    }

    // ========== Share tokens ==========

    /// Mint a share link for a booking. Without an explicit ttl the
    /// window runs 120 days past the departure date when one exists,
    /// otherwise 120 days from now.
    pub fn share(
        &self,
        actor: &Actor,
        booking_id: i64,
        ttl_days: Option<i64>,
    ) -> WorkflowResult<ShareGrant> {
        self.check_gate(actor, Gate::EditBooking(booking_id))?;
        let booking = self.booking(booking_id)?;
        let grant = self.mint_grant(&booking, ttl_days);

        let now = self.clock.now_millis();
        let txn = self.storage.begin_write()?;
        self.activity.record(
            &txn,
            booking_id,
            actor,
            ActivityDraft::new(
                ActivityAction::ShareTokenIssued,
                format!("Share link issued for booking {}", booking.booking_reference),
            ),
            now,
        )?;
        txn.commit().map_err(super::storage::StorageError::from)?;
        Ok(grant)
    }

    /// Revoke all outstanding share links: tokens issued before the lock
    /// instant stop verifying.
    pub fn lock_token(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<()> {
        self.check_gate(actor, Gate::EditBooking(booking_id))?;
        let now = self.clock.now_millis();
        let txn = self.storage.begin_write()?;
        let mut booking = self
            .storage
            .booking_txn(&txn, booking_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("booking {booking_id}")))?;
        let expected = booking.updated_at;
        booking.share_locked_at = Some(self.clock.now_secs());
        self.storage
            .update_booking_cas(&txn, &mut booking, expected, now)?;
        self.activity.record(
            &txn,
            booking_id,
            actor,
            ActivityDraft::new(
                ActivityAction::ShareTokenLocked,
                format!("Share links locked for booking {}", booking.booking_reference),
            ),
            now,
        )?;
        txn.commit().map_err(super::storage::StorageError::from)?;
        Ok(())
    }

    /// Clear the lock and mint a fresh share link.
    pub fn reset_token(&self, actor: &Actor, booking_id: i64) -> WorkflowResult<ShareGrant> {
        self.check_gate(actor, Gate::EditBooking(booking_id))?;
        let now = self.clock.now_millis();
        let txn = self.storage.begin_write()?;
        let mut booking = self
            .storage
            .booking_txn(&txn, booking_id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("booking {booking_id}")))?;
        let expected = booking.updated_at;
        booking.share_locked_at = None;
        self.storage
            .update_booking_cas(&txn, &mut booking, expected, now)?;
        self.activity.record(
            &txn,
            booking_id,
            actor,
            ActivityDraft::new(
                ActivityAction::ShareTokenReset,
                format!("Share links reset for booking {}", booking.booking_reference),
            ),
            now,
        )?;
        txn.commit().map_err(super::storage::StorageError::from)?;
        Ok(self.mint_grant(&booking, None))
    }

    /// Stateless verification plus the per-booking lock check. Tokens
    /// issued before the lock instant are reported as expired.
    pub fn verify_token(&self, token: &str) -> WorkflowResult<i64> {
        let claims = self.codec.verify(token, self.clock.now_secs())?;
        let booking = self.booking(claims.booking_id)?;
        if let Some(locked_at) = booking.share_locked_at {
            if claims.issued_at < locked_at {
                return Err(WorkflowError::Token(TokenError::Expired));
            }
        }
        Ok(claims.booking_id)
    }

    fn mint_grant(&self, booking: &Booking, ttl_days: Option<i64>) -> ShareGrant {
        let now_secs = self.clock.now_secs();
        let expires_at = match ttl_days {
            Some(days) => now_secs + days * SECS_PER_DAY,
            None => match booking.departure_date {
                Some(departure) => {
                    let horizon = departure
                        .checked_add_days(Days::new(self.share_ttl_days as u64))
                        .unwrap_or(departure);
                    date_start_secs(horizon, self.tz)
                }
                None => now_secs + self.share_ttl_days * SECS_PER_DAY,
            },
        };
        let token = self.codec.mint(booking.id, now_secs, expires_at);
        let url = format!("{}/public/booking/{token}", self.public_base_url);
        ShareGrant {
            token,
            url,
            expires_at,
        }
    }

    // ========== Rendering ==========

    /// Retry the deferred render for a booking. On success the queue
    /// entry is removed; on failure its attempt counter is bumped.
    pub fn re_render(&self, booking_id: i64) -> WorkflowResult<ArtifactHandle> {
        let pending = self
            .storage
            .get_pending_render(booking_id)?
            .ok_or_else(|| {
                WorkflowError::NotFound(format!("no deferred render for booking {booking_id}"))
            })?;
        match self.render_now(&pending.request) {
            Ok(artifact) => {
                self.storage.remove_pending_render(booking_id)?;
                Ok(artifact)
            }
            Err(e) => {
                let message = e.to_string();
                self.storage.enqueue_render(&PendingRender {
                    attempts: pending.attempts + 1,
                    last_error: Some(message.clone()),
                    ..pending
                })?;
                Err(WorkflowError::RendererUnavailable(message))
            }
        }
    }

    /// Drain the deferred queue once. Returns (rendered, still pending).
    pub fn retry_pending_renders(&self) -> WorkflowResult<(usize, usize)> {
        let pending = self.storage.list_pending_renders()?;
        let mut rendered = 0;
        let mut remaining = 0;
        for entry in pending {
            match self.re_render(entry.booking_id) {
                Ok(_) => rendered += 1,
                Err(e) => {
                    remaining += 1;
                    tracing::warn!(
                        booking_id = entry.booking_id,
                        attempts = entry.attempts + 1,
                        error = %e,
                        "deferred render still failing"
                    );
                }
            }
        }
        Ok((rendered, remaining))
    }

    pub fn pending_renders(&self) -> WorkflowResult<Vec<PendingRender>> {
        Ok(self.storage.list_pending_renders()?)
    }

    /// Render after commit. Failure is non-fatal: the request lands on
    /// the deferred queue for the retry worker.
    fn render_or_defer(&self, request: &RenderRequest) {
        if let Err(e) = self.render_now(request) {
            tracing::warn!(
                booking_id = request.booking_id,
                kind = %request.kind,
                error = %e,
                "render deferred"
            );
            let pending = PendingRender {
                booking_id: request.booking_id,
                request: request.clone(),
                queued_at: self.clock.now_millis(),
                attempts: 1,
                last_error: Some(e.to_string()),
            };
            if let Err(e) = self.storage.enqueue_render(&pending) {
                tracing::error!(booking_id = request.booking_id, error = %e, "failed to queue deferred render");
            }
        }
    }

    /// Snapshots are rebuilt from storage on every attempt so a stale
    /// artifact is never produced.
    fn render_now(&self, request: &RenderRequest) -> WorkflowResult<ArtifactHandle> {
        let body = match request.kind {
            DocumentKind::Quote => serde_json::to_value(self.quote_document(request.document_id)?),
            DocumentKind::Invoice => {
                serde_json::to_value(self.invoice_document(request.document_id)?)
            }
            DocumentKind::Voucher => serde_json::to_value(self.booking(request.document_id)?),
        }
        .map_err(|e| WorkflowError::RendererUnavailable(e.to_string()))?;
        let snapshot = DocumentSnapshot {
            request: request.clone(),
            body,
        };
        self.renderer
            .render(&snapshot)
            .map_err(|e| WorkflowError::RendererUnavailable(e.to_string()))
    }

    // ========== Queries ==========

    pub fn booking(&self, id: i64) -> WorkflowResult<Booking> {
        self.storage
            .get_booking(id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("booking {id}")))
    }

    pub fn booking_by_reference(&self, reference: &str) -> WorkflowResult<Booking> {
        self.storage
            .find_booking_by_reference(reference)?
            .ok_or_else(|| WorkflowError::NotFound(format!("booking {reference}")))
    }

    pub fn quote_document(&self, id: i64) -> WorkflowResult<Quote> {
        self.storage
            .get_quote(id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("quote {id}")))
    }

    pub fn invoice_document(&self, id: i64) -> WorkflowResult<Invoice> {
        self.storage
            .get_invoice(id)?
            .ok_or_else(|| WorkflowError::NotFound(format!("invoice {id}")))
    }

    pub fn activity(&self, booking_id: i64) -> WorkflowResult<Vec<ActivityEntry>> {
        Ok(self.activity.for_booking(booking_id)?)
    }

    pub fn storage(&self) -> &WorkflowStorage {
        &self.storage
    }

    pub fn permissions(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    // ========== Internals ==========

    /// Run one action: single write transaction, activity persistence,
    /// deadline check, post-commit rendering.
    fn run(&self, actor: &Actor, action: &dyn WorkflowAction) -> WorkflowResult<ActionOutcome> {
        let started = self.clock.now_millis();
        let txn = self.storage.begin_write()?;
        let ctx = ActionContext {
            storage: &self.storage,
            txn: &txn,
            actor,
            now_millis: started,
            today: local_date(started, self.tz),
            tz: self.tz,
        };
        let outcome = action.execute(&ctx)?;

        for draft in &outcome.log {
            self.activity
                .record(&txn, outcome.booking.id, actor, draft.clone(), started)?;
        }

        // Deadline check before commit; dropping the transaction rolls
        // everything back.
        let elapsed = self.clock.now_millis().saturating_sub(started);
        if elapsed > self.request_timeout_ms as i64 {
            drop(txn);
            return Err(WorkflowError::Timeout);
        }
        txn.commit().map_err(super::storage::StorageError::from)?;

        if !outcome.is_no_op() {
            if let Some(request) = &outcome.render {
                self.render_or_defer(request);
            }
        }
        Ok(outcome)
    }

    fn check_gate(&self, actor: &Actor, gate: Gate) -> WorkflowResult<()> {
        // System operations bypass the gate
        let Some(user) = actor.user.as_ref() else {
            return Ok(());
        };
        let allowed = match gate {
            Gate::Module(module, action) => self.permissions.has(user, module, action),
            Gate::EditBooking(booking_id) => {
                let booking = self.booking(booking_id)?;
                self.permissions.can_edit_booking(user, &booking)
            }
            Gate::MarkPaid => {
                self.permissions.has(user, "financial", "edit")
                    && matches!(user.role, Role::Administrator | Role::Manager)
            }
        };
        if allowed {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(format!(
                "user {} denied",
                user.username
            )))
        }
    }

    /// Quote document edits accept either scope of the quotes module.
    fn check_quote_edit(&self, actor: &Actor) -> WorkflowResult<()> {
        let Some(user) = actor.user.as_ref() else {
            return Ok(());
        };
        if self.permissions.has(user, "quotes", "edit_all")
            || self.permissions.has(user, "quotes", "edit_own")
        {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(format!(
                "user {} denied",
                user.username
            )))
        }
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("tz", &self.tz)
            .finish_non_exhaustive()
    }
}
