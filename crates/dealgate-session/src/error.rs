//! Error types for the session layer.
//!
//! Almost nothing in this crate returns an error: refresh failures become
//! `false`, expired sessions become a forced logout. What remains are
//! setup mistakes and bad login input.

/// Errors that can occur building a session controller or parsing login
/// input.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No timer implementation was supplied and no tokio runtime is
    /// available to create one.
    #[error(transparent)]
    Timers(#[from] dealgate_timer::TimerError),

    /// A role string that is not `buyer`, `seller` or `admin`.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Login input carried a token but not everything a session needs.
    #[error("missing login parameter: {0}")]
    MissingParameter(&'static str),
}
