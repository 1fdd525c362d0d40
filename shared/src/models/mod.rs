//! Data models
//!
//! Shared between the workflow core and any API surface built on top of it.
//! All IDs are `i64` (snowflake-style, see [`crate::util::snowflake_id`]).
//! Timestamps are Unix milliseconds unless a field name says otherwise;
//! share-token instants are Unix seconds.

pub mod activity;
pub mod booking;
pub mod customer;
pub mod invoice;
pub mod permission;
pub mod quote;
pub mod user;

// Re-exports
pub use activity::*;
pub use booking::*;
pub use customer::*;
pub use invoice::*;
pub use permission::*;
pub use quote::*;
pub use user::*;
