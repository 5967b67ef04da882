//! Transport abstraction for the refresh endpoint.
//!
//! The session layer needs exactly one network capability: exchange a
//! refresh token for a new access token. [`RefreshTransport`] is that
//! capability as a trait, so the session core can be driven by the real
//! HTTP client in production and by a scripted fake in tests.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpRefreshClient`] via `reqwest`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpRefreshClient};

use std::future::Future;
use std::sync::Arc;

use dealgate_token::{RefreshRequest, RefreshResponse};

/// Path of the refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "auth/refresh";

/// Exchanges a refresh token for a new access token.
///
/// Any error is a failed refresh: non-2xx status, timeout, connection
/// failure and unparseable body are all the same to the caller. The
/// variants exist for logs.
pub trait RefreshTransport: Send + Sync + 'static {
    /// Performs one refresh round-trip.
    fn refresh(
        &self,
        request: RefreshRequest,
    ) -> impl Future<Output = Result<RefreshResponse, TransportError>> + Send;
}

/// Shared transports: lets tests keep a handle on a fake after giving it
/// to the session layer.
impl<T: RefreshTransport> RefreshTransport for Arc<T> {
    fn refresh(
        &self,
        request: RefreshRequest,
    ) -> impl Future<Output = Result<RefreshResponse, TransportError>> + Send {
        (**self).refresh(request)
    }
}
