//! Workflow actions
//!
//! One struct per booking transition. Actions run inside the engine's
//! write transaction and never touch permissions; the engine gates the
//! caller before constructing the [`ActionContext`].

mod accept_quote;
mod add_payment;
mod apply_invoice;
mod cancel;
mod complete;
mod confirm;
mod create_booking;
mod mark_paid;
mod quote;
mod send_quote;
mod voucher;

pub use accept_quote::AcceptQuoteAction;
pub use add_payment::AddPaymentAction;
pub use apply_invoice::ApplyInvoiceAction;
pub use cancel::CancelAction;
pub use complete::CompleteAction;
pub use confirm::ConfirmAction;
pub use create_booking::CreateBookingAction;
pub use mark_paid::MarkPaidAction;
pub use quote::QuoteAction;
pub use send_quote::SendQuoteAction;
pub use voucher::VoucherAction;

use super::context::{ActionContext, ActionOutcome};
use super::error::WorkflowResult;

/// A single atomic workflow operation.
pub trait WorkflowAction {
    fn execute(&self, ctx: &ActionContext<'_>) -> WorkflowResult<ActionOutcome>;
}
