//! ApplyInvoice action
//!
//! `quoted → invoiced`. Converts the quote into an invoice; the invoice
//! number is allocated here, at conversion time, never reserved earlier.

use chrono::Days;
use rust_decimal::Decimal;
use shared::models::{
    ActivityAction, BookingStatus, Invoice, InvoiceStatus, PaymentStatus, Quote, QuoteStatus,
    INVOICE_DUE_DAYS,
};
use shared::util::snowflake_id;

use crate::idgen;
use crate::render::{DocumentKind, RenderRequest};
use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct ApplyInvoiceAction {
    pub booking_id: i64,
}

/// Copy a quote into a fresh draft invoice.
pub(crate) fn build_invoice_from_quote(
    quote: &Quote,
    invoice_number: String,
    today: chrono::NaiveDate,
    now_millis: i64,
) -> Invoice {
    Invoice {
        id: snowflake_id(),
        invoice_number,
        booking_id: quote.booking_id,
        quote_id: Some(quote.id),
        invoice_date: today,
        due_date: today
            .checked_add_days(Days::new(INVOICE_DUE_DAYS as u64))
            .unwrap_or(today),
        status: InvoiceStatus::Draft,
        payment_status: PaymentStatus::Unpaid,
        subtotal: quote.subtotal,
        tax_rate: quote.tax_rate,
        tax_amount: quote.tax_amount,
        discount_amount: quote.discount_amount,
        total_amount: quote.total_amount,
        paid_amount: Decimal::ZERO,
        balance_due: quote.total_amount,
        line_items: quote.line_items.clone(),
        payments: vec![],
        created_at: now_millis,
        updated_at: now_millis,
    }
}

impl WorkflowAction for ApplyInvoiceAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;

        // 1. Idempotent repeat
        if booking.status == BookingStatus::Invoiced {
            let invoice = match booking.invoice_id {
                Some(id) => Some(ctx.load_invoice(id)?),
                None => None,
            };
            let mut outcome = ActionOutcome::no_op(booking);
            outcome.invoice = invoice;
            return Ok(outcome);
        }

        if booking.status != BookingStatus::Quoted {
            return Err(WorkflowError::InvalidTransition {
                from: booking.status,
                requested: BookingStatus::Invoiced,
            });
        }

        // 2. The quote being converted must still be convertible
        let quote_id = booking.quote_id.ok_or_else(|| {
            WorkflowError::InvalidDocumentState(format!(
                "booking {} has no quote",
                booking.booking_reference
            ))
        })?;
        let mut quote = ctx.load_quote(quote_id)?;
        if quote.status == QuoteStatus::Converted {
            return Err(WorkflowError::InvalidDocumentState(format!(
                "quote {} is already converted",
                quote.quote_number
            )));
        }

        // 3. Allocate the invoice number and copy the quote
        let invoice_number =
            idgen::next_invoice_number(ctx.storage, ctx.txn, ctx.now_millis, ctx.tz)?;
        let invoice =
            build_invoice_from_quote(&quote, invoice_number.clone(), ctx.today, ctx.now_millis);
        ctx.storage.insert_invoice(ctx.txn, &invoice)?;

        // 4. Convert the quote
        let expected_quote = quote.updated_at;
        quote.status = QuoteStatus::Converted;
        ctx.store_quote(&mut quote, expected_quote)?;

        // 5. Advance the booking and its mirrors
        let expected = booking.updated_at;
        booking.status = BookingStatus::Invoiced;
        booking.invoice_id = Some(invoice.id);
        booking.invoice_number = Some(invoice_number.clone());
        booking.invoice_status = Some(InvoiceStatus::Draft);
        booking.invoice_amount = Some(invoice.total_amount);
        booking.quote_status = Some(QuoteStatus::Converted);
        if booking.invoiced_at.is_none() {
            booking.invoiced_at = Some(ctx.now_millis);
        }
        ctx.store_booking(&mut booking, expected)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::InvoiceCreated,
            format!(
                "Invoice {invoice_number} created from quote {}",
                quote.quote_number
            ),
        )
        .with_change(
            BookingStatus::Quoted.to_string(),
            booking.status.to_string(),
        )];
        let render = Some(RenderRequest {
            booking_id: booking.id,
            kind: DocumentKind::Invoice,
            document_id: invoice.id,
            number: invoice_number,
        });

        Ok(ActionOutcome {
            booking,
            quote: Some(quote),
            invoice: Some(invoice),
            log,
            render,
        })
    }
}
