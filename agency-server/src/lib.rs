//! Booking lifecycle & document workflow core
//!
//! The engineering heart of the agency back office:
//!
//! - **workflow**: the booking state machine, one action per transition,
//!   transactional persistence and denormalized mirror maintenance
//! - **idgen**: monotonic document numbers and booking references
//! - **auth**: role/override permission evaluation
//! - **share**: signed, time-limited public share tokens
//! - **activity**: append-only per-booking audit trail
//! - **render**: document renderer interface, deferred-render queue,
//!   artifact cache sweep
//!
//! # Control flow
//!
//! ```text
//! caller ─▶ permission gate ─▶ workflow action (redb txn)
//!                                   ├─ mutate booking / create documents
//!                                   ├─ append activity entry
//!                                   └─ commit
//!                              post-commit: render artifact (deferred on failure)
//! ```

pub mod activity;
pub mod auth;
pub mod config;
pub mod idgen;
pub mod render;
pub mod share;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use workflow::{Actor, WorkflowEngine, WorkflowError, WorkflowStorage};
