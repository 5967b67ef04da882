//! Types the controller reports to its host: auth status, logout reasons,
//! lifecycle events and tab visibility.

use std::fmt;
use std::sync::Arc;

use dealgate_token::Role;

// ---------------------------------------------------------------------------
// AuthStatus
// ---------------------------------------------------------------------------

/// Snapshot returned by
/// [`SessionController::check_auth`](crate::SessionController::check_auth).
///
/// `role` and `user_id` describe whatever is stored, even when the access
/// token has already expired and `authenticated` is `false`. The host can
/// use them to pick a login page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub role: Option<Role>,
    pub user_id: Option<String>,
}

impl AuthStatus {
    /// Nothing stored.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// LogoutReason
// ---------------------------------------------------------------------------

/// Why a session ended. Logged and published, never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogoutReason {
    /// The user asked to log out.
    UserInitiated,
    /// No activity for the whole inactivity window.
    Inactivity,
    /// A scheduled refresh failed or had no refresh token to use.
    RefreshFailed,
    /// The tab became visible and the session was gone from storage.
    SessionEnded,
    /// The tab became visible with an expired token that could not be
    /// refreshed.
    SessionExpired,
    /// The API rejected the access token.
    Unauthorized,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserInitiated => "user initiated",
            Self::Inactivity => "inactivity",
            Self::RefreshFailed => "refresh failed",
            Self::SessionEnded => "session ended",
            Self::SessionExpired => "session expired",
            Self::Unauthorized => "unauthorized",
        })
    }
}

/// Back-reference from a timer-driven component to the controller.
pub(crate) type LogoutHook = Arc<dyn Fn(LogoutReason) + Send + Sync>;

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Lifecycle notifications published on the controller's broadcast
/// channel. Token values are never included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { user_id: String, role: Role },
    Refreshed { user_id: String },
    LoggedOut { reason: LogoutReason },
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Whether the tab is in front of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}
