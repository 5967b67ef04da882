/// Errors that can occur talking to the refresh endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint answered with a non-2xx status.
    #[error("refresh endpoint returned HTTP {0}")]
    Status(u16),

    /// The request did not complete within the client timeout.
    #[error("refresh request timed out")]
    Timeout,

    /// The request could not be sent or the connection failed.
    #[cfg(feature = "http")]
    #[error("refresh request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// A 2xx response whose body is not a refresh response.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The configured API base is not a usable URL.
    #[error("invalid API base URL {0:?}")]
    InvalidBaseUrl(String),
}
