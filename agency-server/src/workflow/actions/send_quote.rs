//! SendQuote action
//!
//! Marks the draft quote as sent and attaches the public share grant the
//! engine minted (30-day window). The booking status stays `quoted`; only
//! the quote document and the booking's quote-status mirror move.

use shared::models::{ActivityAction, QuoteStatus};

use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct SendQuoteAction {
    pub booking_id: i64,
    /// Minted by the engine before the transaction opens.
    pub share_token: String,
    /// Unix seconds.
    pub public_expiry: i64,
}

impl WorkflowAction for SendQuoteAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;
        let quote_id = booking.quote_id.ok_or_else(|| {
            WorkflowError::InvalidDocumentState(format!(
                "booking {} has no quote",
                booking.booking_reference
            ))
        })?;
        let mut quote = ctx.load_quote(quote_id)?;

        // Idempotent repeat keeps the original token
        if quote.status == QuoteStatus::Sent {
            let mut outcome = ActionOutcome::no_op(booking);
            outcome.quote = Some(quote);
            return Ok(outcome);
        }

        if quote.status != QuoteStatus::Draft {
            return Err(WorkflowError::InvalidDocumentState(format!(
                "quote {} is {} and cannot be sent",
                quote.quote_number, quote.status
            )));
        }

        let expected_quote = quote.updated_at;
        quote.status = QuoteStatus::Sent;
        quote.share_token = Some(self.share_token.clone());
        quote.is_public = true;
        quote.public_expiry = Some(self.public_expiry);
        ctx.store_quote(&mut quote, expected_quote)?;

        let expected_booking = booking.updated_at;
        booking.quote_status = Some(QuoteStatus::Sent);
        ctx.store_booking(&mut booking, expected_booking)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::QuoteSent,
            format!("Quote {} sent to customer", quote.quote_number),
        )
        .with_change(QuoteStatus::Draft.to_string(), quote.status.to_string())];

        Ok(ActionOutcome {
            booking,
            quote: Some(quote),
            invoice: None,
            log,
            render: None,
        })
    }
}
