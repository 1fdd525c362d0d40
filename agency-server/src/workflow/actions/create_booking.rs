//! CreateBooking action
//!
//! Opens a draft booking with a freshly allocated reference.

use rust_decimal::Decimal;
use shared::models::{ActivityAction, Booking, BookingStatus, NewBooking};
use shared::util::snowflake_id;

use crate::idgen;
use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct CreateBookingAction {
    pub input: NewBooking,
}

impl WorkflowAction for CreateBookingAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        // 1. Validate input
        if self.input.time_limit <= 0 {
            return Err(WorkflowError::Validation(
                "time_limit is mandatory".into(),
            ));
        }
        if let Some(rate) = self.input.tax_rate {
            if rate < Decimal::ZERO {
                return Err(WorkflowError::Validation("tax_rate must not be negative".into()));
            }
        }
        if let Some(discount) = self.input.discount_amount {
            if discount < Decimal::ZERO {
                return Err(WorkflowError::Validation(
                    "discount_amount must not be negative".into(),
                ));
            }
        }
        for line in &self.input.products {
            if line.quantity < 0 || line.unit_price < Decimal::ZERO {
                return Err(WorkflowError::Validation(format!(
                    "product line '{}' has a negative quantity or unit price",
                    line.name
                )));
            }
        }

        // 2. Allocate the external reference
        let reference =
            idgen::next_booking_reference(ctx.storage, ctx.txn, ctx.now_millis, ctx.tz)?;

        // 3. Build the draft
        let input = self.input.clone();
        let booking = Booking {
            id: snowflake_id(),
            booking_reference: reference,
            customer_id: input.customer_id,
            supplier_id: input.supplier_id,
            created_by_user_id: ctx.actor.user_id(),
            quote_id: None,
            invoice_id: None,
            status: BookingStatus::Draft,
            confirmed_at: None,
            quoted_at: None,
            invoiced_at: None,
            paid_at: None,
            vouchered_at: None,
            completed_at: None,
            booking_type: input.booking_type,
            total_amount: input
                .products
                .iter()
                .map(|p| p.line_total())
                .sum::<Decimal>(),
            currency: input.currency.unwrap_or_else(|| "THB".into()),
            tax_rate: input.tax_rate.unwrap_or(Decimal::ZERO),
            discount_amount: input.discount_amount.unwrap_or(Decimal::ZERO),
            time_limit: input.time_limit,
            departure_date: input.departure_date,
            return_date: input.return_date,
            quote_number: None,
            quote_status: None,
            invoice_number: None,
            invoice_status: None,
            invoice_amount: None,
            is_paid: false,
            invoice_paid_date: None,
            share_locked_at: None,
            guest_list: input.guest_list,
            products: input.products,
            daily_services: input.daily_services,
            flight_info: None,
            voucher_images: vec![],
            voucher_album_ids: vec![],
            created_at: ctx.now_millis,
            updated_at: ctx.now_millis,
        };

        ctx.storage.insert_booking(ctx.txn, &booking)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::BookingCreated,
            format!("Booking {} created", booking.booking_reference),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::engine::tests_support::test_ctx_parts;
    use shared::models::ProductLine;

    fn input() -> NewBooking {
        NewBooking {
            customer_id: 10,
            supplier_id: None,
            booking_type: Some("package".into()),
            currency: None,
            tax_rate: None,
            discount_amount: None,
            time_limit: 2_000_000_000_000,
            departure_date: None,
            return_date: None,
            guest_list: vec![],
            products: vec![ProductLine {
                name: "Phuket package".into(),
                quantity: 2,
                unit_price: Decimal::from(5_000),
            }],
            daily_services: vec![],
        }
    }

    #[test]
    fn creates_draft_with_reference_and_totals() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };

        let outcome = CreateBookingAction { input: input() }.execute(&ctx).unwrap();
        assert_eq!(outcome.booking.status, BookingStatus::Draft);
        assert!(outcome.booking.booking_reference.starts_with("BK"));
        assert_eq!(outcome.booking.total_amount, Decimal::from(10_000));
        assert_eq!(outcome.booking.currency, "THB");
        assert_eq!(outcome.log.len(), 1);
        assert_eq!(outcome.log[0].action, ActivityAction::BookingCreated);
    }

    #[test]
    fn missing_time_limit_is_rejected() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };

        let mut bad = input();
        bad.time_limit = 0;
        let err = CreateBookingAction { input: bad }.execute(&ctx).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn negative_product_line_is_rejected() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };

        let mut bad = input();
        bad.products[0].unit_price = Decimal::from(-5_000);
        let err = CreateBookingAction { input: bad }.execute(&ctx).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let mut bad = input();
        bad.products[0].quantity = -1;
        let err = CreateBookingAction { input: bad }.execute(&ctx).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn negative_discount_is_rejected() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };

        let mut bad = input();
        bad.discount_amount = Some(Decimal::from(-100));
        let err = CreateBookingAction { input: bad }.execute(&ctx).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }
}
