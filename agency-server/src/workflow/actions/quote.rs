//! Quote action
//!
//! `confirmed → quoted`. Snapshots the booking's product lines into a
//! draft quote; the quote's monetary fields freeze the moment it leaves
//! draft, regardless of later booking edits.

use chrono::Days;
use rust_decimal::Decimal;
use shared::models::{
    ActivityAction, BookingStatus, LineItem, Quote, QuoteStatus, QUOTE_VALID_DAYS,
};
use shared::util::snowflake_id;

use crate::idgen;
use crate::render::{DocumentKind, RenderRequest};
use crate::workflow::actions::WorkflowAction;
use crate::workflow::context::{ActionContext, ActionOutcome, ActivityDraft};
use crate::workflow::error::{WorkflowError, WorkflowResult};

#[derive(Debug, Clone)]
pub struct QuoteAction {
    pub booking_id: i64,
}

impl WorkflowAction for QuoteAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome> {
        let mut booking = ctx.load_booking(self.booking_id)?;

        // 1. Idempotent repeat: return the existing quote, allocate nothing
        if booking.status == BookingStatus::Quoted {
            let quote = match booking.quote_id {
                Some(id) => Some(ctx.load_quote(id)?),
                None => None,
            };
            let mut outcome = ActionOutcome::no_op(booking);
            outcome.quote = quote;
            return Ok(outcome);
        }

        // 2. Only a confirmed booking can be quoted
        if booking.status != BookingStatus::Confirmed {
            return Err(WorkflowError::InvalidTransition {
                from: booking.status,
                requested: BookingStatus::Quoted,
            });
        }

        // 3. Nothing to quote without product lines
        if booking.products.is_empty() {
            return Err(WorkflowError::Validation(
                "booking has no product lines".into(),
            ));
        }

        // 4. Allocate the quote number
        let quote_number =
            idgen::next_quote_number(ctx.storage, ctx.txn, ctx.now_millis, ctx.tz)?;

        // 5. Snapshot products into line items and price the quote
        let line_items: Vec<LineItem> = booking
            .products
            .iter()
            .enumerate()
            .map(|(i, p)| LineItem::new(p.name.clone(), p.quantity, p.unit_price, i as i32))
            .collect();
        let subtotal = booking.products_total().round_dp(2);
        let discount_amount = booking.discount_amount.round_dp(2);
        let tax_amount =
            ((subtotal - discount_amount) * booking.tax_rate / Decimal::from(100)).round_dp(2);
        let total_amount = subtotal - discount_amount + tax_amount;

        let quote = Quote {
            id: snowflake_id(),
            quote_number: quote_number.clone(),
            booking_id: booking.id,
            quote_date: ctx.today,
            valid_until: ctx
                .today
                .checked_add_days(Days::new(QUOTE_VALID_DAYS as u64))
                .unwrap_or(ctx.today),
            subtotal,
            tax_rate: booking.tax_rate,
            tax_amount,
            discount_amount,
            total_amount,
            status: QuoteStatus::Draft,
            share_token: None,
            is_public: false,
            public_expiry: None,
            line_items,
            created_at: ctx.now_millis,
            updated_at: ctx.now_millis,
        };
        ctx.storage.insert_quote(ctx.txn, &quote)?;

        // 6. Advance the booking and maintain its mirrors
        let expected = booking.updated_at;
        booking.status = BookingStatus::Quoted;
        booking.quote_id = Some(quote.id);
        booking.quote_number = Some(quote_number.clone());
        booking.quote_status = Some(QuoteStatus::Draft);
        if booking.quoted_at.is_none() {
            booking.quoted_at = Some(ctx.now_millis);
        }
        ctx.store_booking(&mut booking, expected)?;

        let log = vec![ActivityDraft::new(
            ActivityAction::QuoteCreated,
            format!("Quote {quote_number} created"),
        )
        .with_change(
            BookingStatus::Confirmed.to_string(),
            booking.status.to_string(),
        )];
        let render = Some(RenderRequest {
            booking_id: booking.id,
            kind: DocumentKind::Quote,
            document_id: quote.id,
            number: quote_number,
        });

        Ok(ActionOutcome {
            booking,
            quote: Some(quote),
            invoice: None,
            log,
            render,
        })
    }
}
