//! Client-side session lifecycle for Dealgate.
//!
//! One [`SessionController`] manages the session of one tab context:
//!
//! 1. **Storage**: the session lives in tab-scoped storage behind the
//!    [`TokenStore`], written and cleared as one group.
//! 2. **Proactive refresh**: a single timer refreshes the access token
//!    shortly before it expires, with at most one request in flight.
//! 3. **Inactivity**: a sliding window of user activity; when it runs out
//!    the session ends.
//! 4. **Visibility**: a tab returning to the foreground re-checks its token
//!    directly against the clock.
//!
//! # How it fits in the stack
//!
//! ```text
//! Host app (above)  ← feeds activity/visibility, reads AuthStatus, routes
//!     ↕
//! Session Layer (this crate)  ← store, timers, single-flight refresh
//!     ↕
//! Token / Timer / Transport (below)  ← expiry math, scheduling, HTTP
//! ```

mod config;
mod controller;
mod error;
mod inactivity;
mod login;
mod navigator;
mod refresh;
mod session;
mod storage;
mod store;
mod visibility;

pub use config::{ActivitySignal, LoginRoutes, SessionConfig};
pub use controller::{SessionController, SessionControllerBuilder};
pub use error::SessionError;
pub use login::session_from_query;
pub use navigator::{LogNavigator, Navigator, RecordingNavigator};
pub use refresh::{RefreshOutcome, RefreshState};
pub use session::{AuthStatus, LogoutReason, SessionEvent, Visibility};
pub use storage::{MemoryStorage, TabStorage};
pub use store::{TokenStore, keys, role_key};
pub use visibility::Reconciliation;
