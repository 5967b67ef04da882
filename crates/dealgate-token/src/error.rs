//! Error types for the token layer.
//!
//! Each crate in Dealgate defines its own error enum. A `TokenError` always
//! means "this string is not a token we can read", never a network or
//! storage problem.

/// Errors that can occur while decoding an access token's claims.
///
/// Callers on the session path never see these directly: the expiration
/// clock turns any decode failure into "already expired" (fail-closed).
/// The enum exists so the decoder itself can be tested precisely and so
/// diagnostics can say *why* a token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is not three dot-separated segments.
    #[error("malformed token: expected 3 segments, found {0}")]
    Segments(usize),

    /// The payload segment is not valid base64url.
    #[error("payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload decoded but is not a JSON object of claims.
    #[error("payload is not a JSON claims object: {0}")]
    Json(#[from] serde_json::Error),
}
