//! Top-level configuration: HTTP, session and logging settings in one
//! JSON document.
//!
//! ```json
//! {
//!   "http": { "api_base": "https://api.example.com/v1", "timeout_secs": 15 },
//!   "session": { "inactivity_timeout_secs": 1800 },
//!   "log_filter": "info,dealgate_session=debug"
//! }
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::path::Path;

use dealgate_session::SessionConfig;
use dealgate_transport::HttpConfig;
use serde::{Deserialize, Serialize};

use crate::DealgateError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DealgateConfig {
    pub http: HttpConfig,
    pub session: SessionConfig,
    /// Default `tracing` filter, used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for DealgateConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            session: SessionConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl DealgateConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    /// [`DealgateError::Config`] if the JSON is malformed or a field has
    /// the wrong type.
    pub fn from_json_str(json: &str) -> Result<Self, DealgateError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    /// [`DealgateError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DealgateError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Clamps out-of-range values. See [`SessionConfig::validated`].
    pub fn validated(mut self) -> Self {
        self.session = self.session.validated();
        if self.http.timeout_secs == 0 {
            tracing::warn!("HTTP timeout of zero, using 1 second");
            self.http.timeout_secs = 1;
        }
        self
    }
}
