//! AddPayment action
//!
//! Records one payment against an invoice. Partial payments leave the
//! booking at `invoiced`; the payment that clears the balance performs
//! the full-pay bookkeeping and advances the booking to `paid`.

use rust_decimal::Decimal;
use shared::models::{ActivityAction, BookingStatus, InvoicePayment, PaymentInput};
use shared::util::snowflake_id;

use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct AddPaymentAction {
    pub invoice_id: i64,
    pub payment: PaymentInput,
}

impl WorkflowAction for AddPaymentAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        // 1. Validate the amount
        if self.payment.amount <= Decimal::ZERO {
            return Err(WorkflowError::Validation(
                "payment amount must be positive".into(),
            ));
        }

        let mut invoice = ctx.load_invoice(self.invoice_id)?;
        let mut booking = ctx.load_booking(invoice.booking_id)?;

        // 2. Overpayment is rejected, never clamped
        if self.payment.amount > invoice.balance_due {
            return Err(WorkflowError::Overpayment {
                amount: self.payment.amount,
                balance_due: invoice.balance_due,
            });
        }

        // 3. Append the payment row and recompute the invoice
        let payment = InvoicePayment {
            id: snowflake_id(),
            amount: self.payment.amount,
            payment_method: self.payment.payment_method.clone(),
            reference: self.payment.reference.clone(),
            payment_date: self.payment.payment_date,
            notes: self.payment.notes.clone(),
            recorded_at: ctx.now_millis,
        };
        invoice.payments.push(payment);
        invoice.paid_amount += self.payment.amount;
        invoice.recalculate();

        let expected_invoice = invoice.updated_at;
        ctx.store_invoice(&mut invoice, expected_invoice)?;

        // 4. Mirror maintenance; full payment advances the booking
        let previous_status = booking.status;
        let expected_booking = booking.updated_at;
        booking.invoice_status = Some(invoice.status);
        if invoice.is_fully_paid() {
            if booking.status != BookingStatus::Invoiced {
                return Err(WorkflowError::InvalidTransition {
                    from: booking.status,
                    requested: BookingStatus::Paid,
                });
            }
            booking.status = BookingStatus::Paid;
            booking.is_paid = true;
            booking.invoice_paid_date = Some(self.payment.payment_date);
            if booking.paid_at.is_none() {
                booking.paid_at = Some(ctx.now_millis);
            }
        }
        ctx.store_booking(&mut booking, expected_booking)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::PaymentAdded,
            format!(
                "Payment of {} {} recorded on invoice {} ({})",
                self.payment.amount,
                booking.currency,
                invoice.invoice_number,
                invoice.payment_status
            ),
        )
        .with_change(previous_status.to_string(), booking.status.to_string())];

        Ok(ActionOutcome {
            booking,
            quote: None,
            invoice: Some(invoice),
            log,
            render: None,
        })
    }
}
