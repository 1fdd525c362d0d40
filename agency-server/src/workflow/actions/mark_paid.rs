//! MarkPaid action
//!
//! One-shot settlement for back-office use: from `quoted` or `invoiced`,
//! auto-creates the invoice when absent, records a single payment equal to
//! the outstanding balance and advances the booking straight to `paid`.
//! The engine additionally restricts this operation to Administrator and
//! Manager roles.

use chrono::NaiveDate;
use shared::models::{
    ActivityAction, BookingStatus, InvoicePayment, InvoiceStatus, QuoteStatus,
};
use shared::util::snowflake_id;

use crate::idgen;
use crate::render::{DocumentKind, RenderRequest};
use crate::workflow::actions::apply_invoice::build_invoice_from_quote;
use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct MarkPaidAction {
    pub booking_id: i64,
    pub payment_method: String,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
}

impl WorkflowAction for MarkPaidAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;

        // 1. Idempotent repeat
        if booking.status == BookingStatus::Paid {
            return Ok(ActionOutcome::no_op(booking));
        }

        if !matches!(
            booking.status,
            BookingStatus::Quoted | BookingStatus::Invoiced
        ) {
            return Err(WorkflowError::InvalidTransition {
                from: booking.status,
                requested: BookingStatus::Paid,
            });
        }

        // 2. Materialize the invoice when marking paid straight from quoted
        let previous_status = booking.status;
        let mut created_invoice = false;
        let mut invoice = match booking.invoice_id {
            Some(id) => ctx.load_invoice(id)?,
            None => {
                let quote_id = booking.quote_id.ok_or_else(|| {
                    WorkflowError::InvalidDocumentState(format!(
                        "booking {} has no quote to invoice",
                        booking.booking_reference
                    ))
                })?;
                let mut quote = ctx.load_quote(quote_id)?;
                let invoice_number =
                    idgen::next_invoice_number(ctx.storage, ctx.txn, ctx.now_millis, ctx.tz)?;
                let invoice = build_invoice_from_quote(
                    &quote,
                    invoice_number,
                    ctx.today,
                    ctx.now_millis,
                );
                ctx.storage.insert_invoice(ctx.txn, &invoice)?;

                let expected_quote = quote.updated_at;
                quote.status = QuoteStatus::Converted;
                ctx.store_quote(&mut quote, expected_quote)?;
                booking.quote_status = Some(QuoteStatus::Converted);
                created_invoice = true;
                invoice
            }
        };

        if invoice.balance_due <= rust_decimal::Decimal::ZERO {
            return Err(WorkflowError::InvalidDocumentState(format!(
                "invoice {} has no outstanding balance",
                invoice.invoice_number
            )));
        }

        // 3. Single payment clearing the full balance
        let amount = invoice.balance_due;
        invoice.payments.push(InvoicePayment {
            id: snowflake_id(),
            amount,
            payment_method: self.payment_method.clone(),
            reference: self.reference.clone(),
            payment_date: self.payment_date,
            notes: None,
            recorded_at: ctx.now_millis,
        });
        invoice.paid_amount += amount;
        invoice.recalculate();
        let expected_invoice = invoice.updated_at;
        ctx.store_invoice(&mut invoice, expected_invoice)?;

        // 4. Full-pay bookkeeping on the booking
        let expected = booking.updated_at;
        booking.status = BookingStatus::Paid;
        booking.is_paid = true;
        booking.invoice_id = Some(invoice.id);
        booking.invoice_number = Some(invoice.invoice_number.clone());
        booking.invoice_status = Some(InvoiceStatus::Paid);
        booking.invoice_amount = Some(invoice.total_amount);
        booking.invoice_paid_date = Some(self.payment_date);
        if booking.invoiced_at.is_none() {
            booking.invoiced_at = Some(ctx.now_millis);
        }
        if booking.paid_at.is_none() {
            booking.paid_at = Some(ctx.now_millis);
        }
        ctx.store_booking(&mut booking, expected)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::MarkedPaid,
            format!(
                "Booking {} marked paid via {} on invoice {}",
                booking.booking_reference, self.payment_method, invoice.invoice_number
            ),
        )
        .with_change(previous_status.to_string(), booking.status.to_string())];
        let render = created_invoice.then(|| RenderRequest {
            booking_id: booking.id,
            kind: DocumentKind::Invoice,
            document_id: invoice.id,
            number: invoice.invoice_number.clone(),
        });

        Ok(ActionOutcome {
            booking,
            quote: None,
            invoice: Some(invoice),
            log,
            render,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::engine::tests_support::{
        insert_booking, insert_invoice, insert_quote, sample_booking, sample_invoice,
        sample_quote, test_ctx_parts,
    };
    use rust_decimal::Decimal;
    use shared::models::PaymentStatus;

    fn action() -> MarkPaidAction {
        MarkPaidAction {
            booking_id: 1,
            payment_method: "bank transfer".into(),
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 21).unwrap(),
            reference: Some("KBANK-4417".into()),
        }
    }

    #[test]
    fn from_quoted_creates_invoice_and_settles() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let mut booking = sample_booking(1);
        booking.status = BookingStatus::Quoted;
        booking.quote_id = Some(50);
        insert_booking(&storage, &booking);
        insert_quote(&storage, &sample_quote(50, 1, "QT25010001"));

        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };
        let outcome = action().execute(&ctx).unwrap();

        let invoice = outcome.invoice.unwrap();
        assert!(invoice.invoice_number.starts_with("INV"));
        assert_eq!(invoice.payment_status, PaymentStatus::Paid);
        assert_eq!(invoice.balance_due, Decimal::ZERO);
        assert_eq!(invoice.payments.len(), 1);

        assert_eq!(outcome.booking.status, BookingStatus::Paid);
        assert!(outcome.booking.is_paid);
        assert_eq!(outcome.booking.quote_status, Some(QuoteStatus::Converted));
        assert_eq!(outcome.booking.invoiced_at, Some(now));
        assert!(outcome.render.is_some());
    }

    #[test]
    fn from_invoiced_settles_outstanding_balance() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        let mut booking = sample_booking(1);
        booking.status = BookingStatus::Invoiced;
        booking.invoice_id = Some(70);
        insert_booking(&storage, &booking);
        let mut invoice = sample_invoice(70, 1, "INV25010001", 10_000);
        invoice.paid_amount = Decimal::from(4_000);
        invoice.recalculate();
        insert_invoice(&storage, &invoice);

        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };
        let outcome = action().execute(&ctx).unwrap();

        let invoice = outcome.invoice.unwrap();
        assert_eq!(invoice.paid_amount, Decimal::from(10_000));
        assert_eq!(invoice.payments.len(), 1);
        assert_eq!(invoice.payments[0].amount, Decimal::from(6_000));
        assert_eq!(outcome.booking.status, BookingStatus::Paid);
        // No new invoice, no render request
        assert!(outcome.render.is_none());
    }

    #[test]
    fn repeat_mark_paid_is_a_no_op() {
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
        let outcome = action().execute(&ctx).unwrap();
        assert!(outcome.is_no_op());
    }

    #[test]
    fn mark_paid_from_draft_is_invalid() {
        let (storage, actor, now, today, tz) = test_ctx_parts();
        insert_booking(&storage, &sample_booking(1));

        let txn = storage.begin_write().unwrap();
        let ctx = ActionContext {
            storage: &storage,
            txn: &txn,
            actor: &actor,
            now_millis: now,
            today,
            tz,
        };
        let err = action().execute(&ctx).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: BookingStatus::Draft,
                requested: BookingStatus::Paid,
            }
        ));
    }
}
