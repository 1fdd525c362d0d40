//! Public share links
//!
//! Stateless, signed, time-limited tokens granting anonymous read access
//! to one booking's public view. There is no revocation list; expiry is
//! encoded in the token and per-booking revocation uses the lock
//! timestamp stored on the booking.

mod token;

pub use token::{TokenCodec, TokenError, VerifiedToken};
