//! Expiration clock: fail-closed expiry checks.
//!
//! All functions take `now` explicitly instead of reading the system clock,
//! so the session layer can drive them from a simulated clock in tests.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::decode_claims;

/// Returns the instant `token` expires, or `None` if it cannot be read.
///
/// `None` covers every failure: malformed structure, bad base64, a payload
/// that is not a claims object, a missing `exp`, or an `exp` that is
/// negative or not finite. Never panics.
pub fn expiration_of(token: &str) -> Option<SystemTime> {
    let claims = match decode_claims(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "access token is unreadable, treating as expired");
            return None;
        }
    };

    let exp = claims.exp?;
    let since_epoch = Duration::try_from_secs_f64(exp).ok()?;
    UNIX_EPOCH.checked_add(since_epoch)
}

/// `true` if `token` is expired at `now`, or will be within `buffer`.
///
/// Fail-closed: a token without a readable expiration is always treated as
/// expired. Pass `Duration::ZERO` for the strict check.
pub fn is_expired_or_expiring(token: &str, buffer: Duration, now: SystemTime) -> bool {
    match expiration_of(token) {
        // `now >= exp - buffer`, written without subtracting from `exp`
        // so an `exp` close to the epoch cannot underflow.
        Some(exp) => now + buffer >= exp,
        None => true,
    }
}

/// How long `token` remains valid after `now`.
///
/// `Duration::ZERO` for expired or unreadable tokens.
pub fn remaining_lifetime(token: &str, now: SystemTime) -> Duration {
    expiration_of(token)
        .and_then(|exp| exp.duration_since(now).ok())
        .unwrap_or(Duration::ZERO)
}
