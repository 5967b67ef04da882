//! Unverified claims decoding for access tokens.
//!
//! An access token is a JWT: `header.payload.signature`, each segment
//! base64url-encoded. The client never checks the signature (it does not
//! hold the key, and the API re-validates every request anyway). It only
//! reads the payload to learn *when* the token expires.
//!
//! The decoder is strict about structure and lenient about content:
//! three segments and a JSON object payload are required, but every claim
//! is optional and unknown claims are ignored.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer};

use crate::TokenError;

/// The subset of registered and private claims Dealgate cares about.
///
/// Every field is optional. A token without `exp` decodes fine here; it is
/// the expiration clock that decides such a token is unusable.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiration, seconds since the Unix epoch. Some issuers emit
    /// fractional seconds, so this is an `f64`.
    #[serde(default)]
    pub exp: Option<f64>,

    /// Issued-at, seconds since the Unix epoch.
    #[serde(default)]
    pub iat: Option<f64>,

    /// Subject (user id). Accepts a JSON string or number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub sub: Option<String>,

    /// Role hint, as issued. Not parsed here: an unknown role is a routing
    /// concern, not a decoding failure.
    #[serde(default)]
    pub role: Option<String>,
}

/// Decodes the payload segment of `token` into [`TokenClaims`].
///
/// # Errors
/// - [`TokenError::Segments`] if the token is not `a.b.c`
/// - [`TokenError::Base64`] if the payload is not base64url
/// - [`TokenError::Json`] if the payload is not a JSON claims object
///
/// # Example
///
/// ```rust
/// use dealgate_token::decode_claims;
///
/// // {"alg":"none"} . {"exp":1700000000,"sub":"u-7"} . (no signature)
/// let token = "eyJhbGciOiJub25lIn0.eyJleHAiOjE3MDAwMDAwMDAsInN1YiI6InUtNyJ9.";
/// let claims = decode_claims(token).unwrap();
/// assert_eq!(claims.exp, Some(1_700_000_000.0));
/// assert_eq!(claims.sub.as_deref(), Some("u-7"));
/// ```
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Segments(segments.len()));
    }

    // Tolerate padded payloads; the JWT spec says unpadded, not every
    // issuer listens.
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload)?;

    // Go through a map first: a derived struct would happily accept a JSON
    // array and assign claims by position.
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(&bytes)?;
    let claims = TokenClaims::deserialize(serde_json::Value::Object(object))?;
    Ok(claims)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
