//! Confirm action
//!
//! `draft → confirmed`. Refused once the confirmation deadline has
//! passed; the booking may still be cancelled afterwards.

use rust_decimal::Decimal;
use shared::models::{ActivityAction, BookingStatus};

use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct ConfirmAction {
    pub booking_id: i64,
}

impl WorkflowAction for ConfirmAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;

        // 1. Idempotent repeat
        if booking.status == BookingStatus::Confirmed {
            return Ok(ActionOutcome::no_op(booking));
        }

        // 2. Only a draft can be confirmed
        if booking.status != BookingStatus::Draft {
            return Err(WorkflowError::InvalidTransition {
                from: booking.status,
                requested: BookingStatus::Confirmed,
            });
        }

        // 3. Commercial fields must be in place
        if booking.total_amount <= Decimal::ZERO {
            return Err(WorkflowError::Validation(
                "total_amount must be set before confirmation".into(),
            ));
        }

        // 4. Deadline check
        if ctx.now_millis > booking.time_limit {
            return Err(WorkflowError::TimeLimitElapsed);
        }

        // 5. Transition
        let expected = booking.updated_at;
        booking.status = BookingStatus::Confirmed;
        if booking.confirmed_at.is_none() {
            booking.confirmed_at = Some(ctx.now_millis);
        }
        ctx.store_booking(&mut booking, expected)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::BookingConfirmed,
            format!("Booking {} confirmed", booking.booking_reference),
        )
        .with_change(BookingStatus::Draft.to_string(), booking.status.to_string())];

        Ok(ActionOutcome {
            booking,
            quote: None,
            invoice: None,
            log,
            render: None,
        })
    }
}
