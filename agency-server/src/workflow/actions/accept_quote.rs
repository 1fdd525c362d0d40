//! AcceptQuote action
//!
//! Records the customer's acceptance. Expiry is checked here, at
//! acceptance time; a quote lapsing while the booking sits in `quoted`
//! does not transition anything on its own.

use shared::models::{ActivityAction, QuoteStatus};

use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct AcceptQuoteAction {
    pub booking_id: i64,
}

impl WorkflowAction for AcceptQuoteAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;
        let quote_id = booking.quote_id.ok_or_else(|| {
            WorkflowError::InvalidDocumentState(format!(
                "booking {} has no quote",
                booking.booking_reference
            ))
        })?;
        let mut quote = ctx.load_quote(quote_id)?;

        if quote.status == QuoteStatus::Accepted {
            let mut outcome = ActionOutcome::no_op(booking);
            outcome.quote = Some(quote);
            return Ok(outcome);
        }

        if !matches!(quote.status, QuoteStatus::Draft | QuoteStatus::Sent) {
            return Err(WorkflowError::InvalidDocumentState(format!(
                "quote {} is {} and cannot be accepted",
                quote.quote_number, quote.status
            )));
        }

        if quote.is_expired(ctx.today) {
            return Err(WorkflowError::InvalidDocumentState(format!(
                "quote {} expired on {}",
                quote.quote_number, quote.valid_until
            )));
        }

        let previous = quote.status;
        let expected_quote = quote.updated_at;
        quote.status = QuoteStatus::Accepted;
        ctx.store_quote(&mut quote, expected_quote)?;

        let expected_booking = booking.updated_at;
        booking.quote_status = Some(QuoteStatus::Accepted);
        ctx.store_booking(&mut booking, expected_booking)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::QuoteAccepted,
            format!("Quote {} accepted", quote.quote_number),
        )
        .with_change(previous.to_string(), quote.status.to_string())];

        Ok(ActionOutcome {
            booking,
            quote: Some(quote),
            invoice: None,
            log,
            render: None,
        })
    }
}
