//! Session record and refresh wire types.
//!
//! [`Session`] is the only persistent entity on the client side. The
//! refresh types mirror the JSON bodies of `POST /auth/refresh`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Which side of the marketplace a user acts on.
///
/// The role decides which login page a logged-out tab is sent back to,
/// and it is stored next to the access token so the two are never out of
/// sync.
///
/// Serialized lowercase (`"buyer"`), matching what the backend puts in
/// tokens and redirect links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

impl Role {
    /// Every role, in a stable order. Used when sweeping role-prefixed
    /// storage keys.
    pub const ALL: [Role; 3] = [Role::Buyer, Role::Seller, Role::Admin];

    /// The lowercase wire name (`"buyer"`, `"seller"`, `"admin"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing is case-insensitive and ignores surrounding whitespace, because
/// role strings arrive from query parameters and older storage entries.
impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authenticated session held by one tab.
///
/// `access_token`, `user_id` and `role` always travel together: the token
/// store writes and clears them as a group, so an access token is never
/// observable without the role it was issued for.
///
/// `Debug` is implemented by hand so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived signed token sent as `Authorization: Bearer ...`.
    pub access_token: String,

    /// Longer-lived credential used only to mint a new access token.
    /// Absent when the login flow did not hand one out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Opaque id of the logged-in user.
    pub user_id: String,

    pub role: Role,
}

impl Session {
    /// Convenience constructor for a session without a refresh token.
    pub fn new(
        access_token: impl Into<String>,
        user_id: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            user_id: user_id.into(),
            role,
        }
    }

    /// Builder-style setter for the refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Refresh wire types
// ---------------------------------------------------------------------------

/// Body of `POST {api_base}/auth/refresh`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Successful response from the refresh endpoint.
///
/// `refresh_token` is only present when the backend rotates refresh
/// tokens. When it is missing the client keeps the one it already has.
/// Unknown fields (`token_type`, `expires_in`, ...) are ignored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("access_token", &"<redacted>")
            .field("rotated", &self.refresh_token.is_some())
            .finish()
    }
}
