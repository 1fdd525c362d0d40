//! Voucher action
//!
//! `paid → vouchered`. Issues the travel document and asks the renderer
//! for the voucher artifact; rendering failure never blocks the
//! transition.

use shared::models::{ActivityAction, BookingStatus};

use crate::render::{DocumentKind, RenderRequest};
use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct VoucherAction {
    pub booking_id: i64,
}

impl WorkflowAction for VoucherAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;

        if booking.status == BookingStatus::Vouchered {
            return Ok(ActionOutcome::no_op(booking));
        }

        if booking.status != BookingStatus::Paid {
            return Err(WorkflowError::InvalidTransition {
                from: booking.status,
                requested: BookingStatus::Vouchered,
            });
        }

        let expected = booking.updated_at;
        booking.status = BookingStatus::Vouchered;
        if booking.vouchered_at.is_none() {
            booking.vouchered_at = Some(ctx.now_millis);
        }
        ctx.store_booking(&mut booking, expected)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::VoucherIssued,
            format!("Voucher issued for booking {}", booking.booking_reference),
        )
        .with_change(
            BookingStatus::Paid.to_string(),
            booking.status.to_string(),
        )];
        let render = Some(RenderRequest {
            booking_id: booking.id,
            kind: DocumentKind::Voucher,
            document_id: booking.id,
            number: booking.booking_reference.clone(),
        });

        Ok(ActionOutcome {
            booking,
            quote: None,
            invoice: None,
            log,
            render,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::engine::tests_support::{insert_booking, sample_booking, test_ctx_parts};

    #[test]
    fn vouchers_a_paid_booking_and_requests_render() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let mut booking = sample_booking(1);
        booking.status = BookingStatus::Paid;
        insert_booking(&storage, &booking);

        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };
        let outcome = VoucherAction { booking_id: 1 }.execute(&ctx).unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Vouchered);
        assert_eq!(outcome.booking.vouchered_at, Some(now));
        let render = outcome.render.unwrap();
        assert_eq!(render.kind, DocumentKind::Voucher);
        assert_eq!(render.number, outcome.booking.booking_reference);
    }

    #[test]
    fn voucher_before_payment_is_invalid() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let mut booking = sample_booking(1);
        booking.status = BookingStatus::Invoiced;
        insert_booking(&storage, &booking);

        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };
        let err = VoucherAction { booking_id: 1 }.execute(&ctx).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: BookingStatus::Invoiced,
                requested: BookingStatus::Vouchered,
            }
        ));
    }

    #[test]
    fn repeat_voucher_is_a_no_op() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let mut booking = sample_booking(1);
        booking.status = BookingStatus::Vouchered;
        insert_booking(&storage, &booking);

        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };
        let outcome = VoucherAction { booking_id: 1 }.execute(&ctx).unwrap();
        assert!(outcome.is_no_op());
        assert!(outcome.render.is_none());
    }
}
