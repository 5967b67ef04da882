//! Token-level building blocks for Dealgate.
//!
//! This crate defines what a marketplace session *is* and how much longer
//! its access token is good for:
//!
//! - **Types** ([`Session`], [`Role`], [`RefreshRequest`],
//!   [`RefreshResponse`]): the session record a tab holds and the JSON
//!   exchanged with the refresh endpoint.
//! - **Claims** ([`decode_claims`], [`TokenClaims`]): reads the payload of a
//!   signed access token without verifying it. The issuing server verifies
//!   signatures; the client only needs timing and identity hints.
//! - **Expiration clock** ([`expiration_of`], [`is_expired_or_expiring`]):
//!   fail-closed expiry checks built on the decoder.
//!
//! # Architecture
//!
//! ```text
//! Transport (refresh wire types) ← Token (this crate) → Session (store, timers)
//! ```
//!
//! Nothing here touches the network, the clock, or storage. Callers pass
//! `now` in explicitly so tests can run against a simulated clock.

mod claims;
mod clock;
mod error;
mod types;

pub use claims::{TokenClaims, decode_claims};
pub use clock::{expiration_of, is_expired_or_expiring, remaining_lifetime};
pub use error::TokenError;
pub use types::{RefreshRequest, RefreshResponse, Role, Session};
