//! Complete action
//!
//! `vouchered → completed`, allowed only once the travel period has
//! ended. The auto-completion sweep drives this for due bookings; manual
//! completion goes through the same rules.

use shared::models::{ActivityAction, BookingStatus};

use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct CompleteAction {
    pub booking_id: i64,
}

impl WorkflowAction for CompleteAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;

        if booking.status == BookingStatus::Completed {
            return Ok(ActionOutcome::no_op(booking));
        }

        if booking.status != BookingStatus::Vouchered {
            return Err(WorkflowError::InvalidTransition {
                from: booking.status,
                requested: BookingStatus::Completed,
            });
        }

        // The trip must be over: return date, falling back to departure
        // date for one-way bookings.
        let period_end = booking.return_date.or(booking.departure_date);
        match period_end {
            Some(end) if end <= ctx.today => {}
            Some(end) => {
                return Err(WorkflowError::Validation(format!(
                    "travel period ends {end}, cannot complete yet"
                )));
            }
            None => {
                return Err(WorkflowError::Validation(
                    "booking has no travel dates".into(),
                ));
            }
        }

        let expected = booking.updated_at;
        booking.status = BookingStatus::Completed;
        if booking.completed_at.is_none() {
            booking.completed_at = Some(ctx.now_millis);
        }
        ctx.store_booking(&mut booking, expected)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::BookingCompleted,
            format!("Booking {} completed", booking.booking_reference),
        )
        .with_change(
            BookingStatus::Vouchered.to_string(),
            booking.status.to_string(),
        )];

        Ok(ActionOutcome {
            booking,
            quote: None,
            invoice: None,
            log,
            render: None,
        })
    }
}
