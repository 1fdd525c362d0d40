//! Cancel action
//!
//! Soft cancellation from any pre-invoice-settlement stage. Bookings past
//! `quoted` hold live financial documents and cannot be cancelled here;
//! refunds are a separate back-office flow.

use shared::models::{ActivityAction, BookingStatus};

use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct CancelAction {
    pub booking_id: i64,
}

impl WorkflowAction for CancelAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;

        if booking.status == BookingStatus::Cancelled {
            return Ok(ActionOutcome::no_op(booking));
        }

        if !matches!(
            booking.status,
            BookingStatus::Draft | BookingStatus::Confirmed | BookingStatus::Quoted
        ) {
            return Err(WorkflowError::InvalidTransition {
                from: booking.status,
                requested: BookingStatus::Cancelled,
            });
        }

        let previous = booking.status;
        let expected = booking.updated_at;
        booking.status = BookingStatus::Cancelled;
        ctx.store_booking(&mut booking, expected)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::BookingCancelled,
            format!("Booking {} cancelled", booking.booking_reference),
        )
        .with_change(previous.to_string(), booking.status.to_string())];

        Ok(ActionOutcome {
            booking,
            quote: None,
            invoice: None,
            log,
            render: None,
        })
    }
}
