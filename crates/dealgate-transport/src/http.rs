//! `reqwest` implementation of [`RefreshTransport`].

use std::time::Duration;

use dealgate_token::{RefreshRequest, RefreshResponse};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::{REFRESH_PATH, RefreshTransport, TransportError};

/// HTTP settings shared by the refresh client and the bearer API client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Base URL of the marketplace API, e.g. `https://api.example.com/v1`.
    /// The refresh endpoint is `{api_base}/auth/refresh`.
    pub api_base: String,

    /// Whole-request timeout. A timeout counts as a failed refresh.
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            user_agent: concat!("dealgate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Builds a `reqwest::Client` with this config's timeout and user agent.
    ///
    /// # Errors
    /// [`TransportError::Request`] if the TLS backend fails to initialize.
    pub fn build_client(&self) -> Result<Client, TransportError> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs.max(1)))
            .user_agent(&self.user_agent)
            .build()
            .map_err(TransportError::Request)
    }

    /// Resolves `path` against the API base.
    ///
    /// The base is treated as a directory whether or not it ends in `/`,
    /// so `https://host/api` + `auth/refresh` is `https://host/api/auth/refresh`.
    ///
    /// # Errors
    /// [`TransportError::InvalidBaseUrl`] if the result is not a URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|_| TransportError::InvalidBaseUrl(self.api_base.clone()))
    }
}

/// Calls `POST {api_base}/auth/refresh` with a JSON body.
#[derive(Debug, Clone)]
pub struct HttpRefreshClient {
    http: Client,
    refresh_url: Url,
}

impl HttpRefreshClient {
    /// Builds a client from config.
    ///
    /// # Errors
    /// [`TransportError::InvalidBaseUrl`] for an unusable `api_base`, or
    /// [`TransportError::Request`] if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: config.build_client()?,
            refresh_url: config.endpoint(REFRESH_PATH)?,
        })
    }

    /// Uses an existing `reqwest::Client` (shared connection pool, custom
    /// timeout) against `api_base`.
    ///
    /// # Errors
    /// [`TransportError::InvalidBaseUrl`] for an unusable `api_base`.
    pub fn with_client(http: Client, api_base: &str) -> Result<Self, TransportError> {
        let config = HttpConfig {
            api_base: api_base.to_string(),
            ..HttpConfig::default()
        };
        Ok(Self {
            http,
            refresh_url: config.endpoint(REFRESH_PATH)?,
        })
    }

    /// The resolved refresh endpoint.
    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

impl RefreshTransport for HttpRefreshClient {
    async fn refresh(
        &self,
        request: RefreshRequest,
    ) -> Result<RefreshResponse, TransportError> {
        let resp = self
            .http
            .post(self.refresh_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "refresh endpoint rejected request");
            return Err(TransportError::Status(status.as_u16()));
        }

        resp.json::<RefreshResponse>().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::InvalidResponse(e.to_string())
            }
        })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_with_single_slash() {
        let with_slash = HttpConfig {
            api_base: "https://api.example.com/v1/".into(),
            ..HttpConfig::default()
        };
        let without_slash = HttpConfig {
            api_base: "https://api.example.com/v1".into(),
            ..HttpConfig::default()
        };

        let expected = "https://api.example.com/v1/auth/refresh";
        assert_eq!(with_slash.endpoint("/auth/refresh").unwrap().as_str(), expected);
        assert_eq!(without_slash.endpoint("auth/refresh").unwrap().as_str(), expected);
    }

    #[test]
    fn test_endpoint_invalid_base_returns_error() {
        let config = HttpConfig {
            api_base: "not a url".into(),
            ..HttpConfig::default()
        };
        assert!(matches!(
            config.endpoint(REFRESH_PATH),
            Err(TransportError::InvalidBaseUrl(base)) if base == "not a url"
        ));
    }

    #[test]
    fn test_default_user_agent_names_crate() {
        assert!(HttpConfig::default().user_agent.starts_with("dealgate/"));
    }
}
