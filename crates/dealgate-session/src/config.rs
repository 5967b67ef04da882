//! Session configuration: refresh lead, inactivity window, activity
//! signals and login destinations.

use std::time::Duration;

use dealgate_token::Role;
use serde::{Deserialize, Serialize};

/// Upper bound for the refresh lead. A lead longer than this would refresh
/// typical short-lived tokens continuously.
const MAX_REFRESH_LEAD_SECS: u64 = 3600;

// ---------------------------------------------------------------------------
// ActivitySignal
// ---------------------------------------------------------------------------

/// A user interaction that counts as "the user is still here".
///
/// The host feeds these into
/// [`SessionController::record_activity`](crate::SessionController::record_activity).
/// Only signals in [`SessionConfig::activity_signals`] reset the
/// inactivity window; the rest are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySignal {
    PointerDown,
    PointerMove,
    KeyDown,
    Scroll,
    TouchStart,
    Click,
}

impl ActivitySignal {
    /// All signals, the default observed set.
    pub const ALL: [ActivitySignal; 6] = [
        ActivitySignal::PointerDown,
        ActivitySignal::PointerMove,
        ActivitySignal::KeyDown,
        ActivitySignal::Scroll,
        ActivitySignal::TouchStart,
        ActivitySignal::Click,
    ];
}

// ---------------------------------------------------------------------------
// LoginRoutes
// ---------------------------------------------------------------------------

/// Where a logged-out tab is sent, per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRoutes {
    pub buyer: String,
    pub seller: String,
    pub admin: String,
    /// Used when the role is unknown, e.g. the store was already empty.
    pub member: String,
}

impl Default for LoginRoutes {
    fn default() -> Self {
        Self {
            buyer: "/buyer/login".to_string(),
            seller: "/seller/login".to_string(),
            admin: "/admin/login".to_string(),
            member: "/login".to_string(),
        }
    }
}

impl LoginRoutes {
    /// The login page for `role`, falling back to the generic member page.
    pub fn for_role(&self, role: Option<Role>) -> &str {
        match role {
            Some(Role::Buyer) => &self.buyer,
            Some(Role::Seller) => &self.seller,
            Some(Role::Admin) => &self.admin,
            None => &self.member,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Tunables for one tab's session lifecycle.
///
/// Defaults match what the marketplace backend expects: access tokens are
/// refreshed two minutes before they expire, and fifteen minutes without
/// interaction ends the session.
///
/// ```rust
/// use dealgate_session::SessionConfig;
///
/// let config = SessionConfig {
///     inactivity_timeout_secs: 30 * 60,
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.refresh_lead_secs, 120);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long before the access token's `exp` the refresh fires.
    pub refresh_lead_secs: u64,

    /// Length of the sliding inactivity window.
    pub inactivity_timeout_secs: u64,

    /// Signals that reset the inactivity window.
    pub activity_signals: Vec<ActivitySignal>,

    pub login_routes: LoginRoutes,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_lead_secs: 120,
            inactivity_timeout_secs: 900,
            activity_signals: ActivitySignal::ALL.to_vec(),
            login_routes: LoginRoutes::default(),
        }
    }
}

impl SessionConfig {
    /// Clamps out-of-range values, logging each adjustment.
    ///
    /// - `refresh_lead_secs` is capped at one hour.
    /// - `inactivity_timeout_secs` is raised to at least one second; a zero
    ///   window would log the user out on the next tick.
    /// - duplicate activity signals are dropped.
    pub fn validated(mut self) -> Self {
        if self.refresh_lead_secs > MAX_REFRESH_LEAD_SECS {
            tracing::warn!(
                configured = self.refresh_lead_secs,
                max = MAX_REFRESH_LEAD_SECS,
                "refresh lead too long, clamping"
            );
            self.refresh_lead_secs = MAX_REFRESH_LEAD_SECS;
        }
        if self.inactivity_timeout_secs == 0 {
            tracing::warn!("inactivity timeout of zero, using 1 second");
            self.inactivity_timeout_secs = 1;
        }

        let mut seen = Vec::with_capacity(self.activity_signals.len());
        self.activity_signals.retain(|s| {
            let fresh = !seen.contains(s);
            seen.push(*s);
            fresh
        });
        if self.activity_signals.is_empty() {
            tracing::warn!("no activity signals configured, sessions expire after a fixed window");
        }
        self
    }

    pub fn refresh_lead(&self) -> Duration {
        Duration::from_secs(self.refresh_lead_secs)
    }

    pub fn inactivity_window(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}
