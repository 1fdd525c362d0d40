//! Shared types for the agency back-office
//!
//! Domain models used across the workflow core: bookings, quotes,
//! invoices, users, permissions, and activity log entries.
//! Pure data + serde; persistence lives in `agency-server`.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
