//! Booking workflow module
//!
//! Implements the booking state machine:
//!
//! ```text
//! draft ─confirm─▶ confirmed ─quote─▶ quoted ─apply_invoice─▶ invoiced ─pay─▶ paid
//!    │                 │                 │                        │             │
//!    └──── cancel ─────┴──── cancel ─────┴──────── cancel ────────┘          voucher
//!                                                                              │
//!                                     completed ◀─complete─ vouchered ◀────────┘
//! ```
//!
//! - **storage**: redb persistence for bookings, quotes, invoices, users,
//!   permissions, activity log and the deferred-render queue
//! - **actions**: one struct per transition; validates preconditions and
//!   mutates records inside the write transaction
//! - **engine**: permission gate, transaction orchestration, activity
//!   logging, post-commit rendering, share-token operations
//!
//! Every transition is atomic and produces exactly one activity entry;
//! repeating a transition whose target equals the current status is a
//! no-op that succeeds without logging.

pub mod actions;
pub mod context;
pub mod engine;
pub mod error;
pub mod storage;

#[cfg(test)]
mod tests;

pub use context::{ActionContext, ActionOutcome, Actor};
pub use engine::{ShareGrant, WorkflowEngine};
pub use error::{WorkflowError, WorkflowResult};
pub use storage::{StorageError, WorkflowStorage};
