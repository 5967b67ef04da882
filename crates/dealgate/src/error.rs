//! Unified error type for Dealgate.

use dealgate_session::SessionError;
use dealgate_timer::TimerError;
use dealgate_token::TokenError;
use dealgate_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// With the `dealgate` meta-crate you deal with this one type instead of
/// importing errors from each sub-crate; `?` converts sub-crate errors
/// through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum DealgateError {
    /// Token decoding failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The refresh transport failed or is misconfigured.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Building the session controller or parsing login input failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Timer(#[from] TimerError),

    /// An API call was made with no stored session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The API rejected the access token. The session has been ended.
    #[error("access token rejected by API")]
    Unauthorized,

    /// The API answered with a non-2xx status other than 401.
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// An API request failed to send or its body failed to decode.
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A redirect URL that does not parse.
    #[error("invalid redirect URL: {0}")]
    RedirectUrl(String),

    /// A configuration file that does not parse.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}
