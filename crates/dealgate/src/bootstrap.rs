//! Session bootstrap from a login redirect.
//!
//! The marketplace's sign-in pages finish by redirecting to the app with
//! the new session in the query string:
//!
//! ```text
//! https://app.example.com/dashboard?token=eyJ...&userId=u-42&role=seller&refreshToken=...
//! ```

use dealgate_session::session_from_query;
use dealgate_token::Session;
use reqwest::Url;

use crate::DealgateError;

/// Extracts a session from a redirect URL.
///
/// Accepts `token`/`access_token`, `userId`/`user_id`, `role` and
/// optionally `refreshToken`/`refresh_token`.
///
/// Returns `Ok(None)` for a URL that carries no token, i.e. an ordinary
/// page load.
///
/// # Errors
/// - [`DealgateError::RedirectUrl`] if `url` is not an absolute URL.
/// - [`DealgateError::Session`] if a token is present but the user id or
///   role is missing, or the role is unknown.
pub fn from_redirect_url(url: &str) -> Result<Option<Session>, DealgateError> {
    let parsed = Url::parse(url).map_err(|e| DealgateError::RedirectUrl(e.to_string()))?;
    Ok(session_from_query(parsed.query_pairs())?)
}
