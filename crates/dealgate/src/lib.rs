//! # Dealgate
//!
//! Client-side session and token lifecycle for a multi-role marketplace.
//!
//! A tab logs in once; Dealgate keeps the access token fresh in the
//! background, ends the session after a stretch of inactivity, re-checks
//! the token when the tab comes back into view, and never has more than
//! one refresh request in flight.
//!
//! ## Crates
//!
//! | Crate | Role |
//! |---|---|
//! | `dealgate-token` | session types, unverified claims decoding, expiry checks |
//! | `dealgate-timer` | one-shot timers and clocks (tokio-backed) |
//! | `dealgate-transport` | the refresh endpoint, over `reqwest` |
//! | `dealgate-session` | store, refresh scheduler, inactivity, visibility, controller |
//! | `dealgate` (this crate) | runtime assembly, redirect bootstrap, API client, tracing |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dealgate::prelude::*;
//!
//! # async fn run() -> Result<(), DealgateError> {
//! dealgate::telemetry::init_tracing("info");
//!
//! let runtime = SessionRuntime::builder()
//!     .config(DealgateConfig::default())
//!     .navigator(Arc::new(|path: &str| println!("redirect to {path}")))
//!     .build()?;
//!
//! runtime.session().login("eyJ...", "u-42", Role::Seller, Some("refresh".into()));
//! let deals: serde_json::Value = runtime.api().get("deals").await?;
//! # Ok(())
//! # }
//! ```

mod api;
pub mod bootstrap;
mod config;
mod error;
mod runtime;
pub mod telemetry;

pub use api::ApiClient;
pub use config::DealgateConfig;
pub use error::DealgateError;
pub use runtime::{SessionRuntime, SessionRuntimeBuilder};

pub use dealgate_session as session;
pub use dealgate_timer as timer;
pub use dealgate_token as token;
pub use dealgate_transport as transport;

/// Everything a host usually needs, in one import.
pub mod prelude {
    pub use crate::{ApiClient, DealgateConfig, DealgateError, SessionRuntime};
    pub use dealgate_session::{
        ActivitySignal, AuthStatus, LoginRoutes, LogoutReason, Navigator, Reconciliation,
        SessionConfig, SessionController, SessionEvent, Visibility,
    };
    pub use dealgate_token::{Role, Session};
    pub use dealgate_transport::{HttpConfig, HttpRefreshClient, RefreshTransport};
}
