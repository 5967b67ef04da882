//! Bearer-authenticated calls to the marketplace API.
//!
//! The API owns every business rule; this client only attaches the tab's
//! access token and reacts to the API's verdict on it:
//!
//! - a token inside the refresh lead is refreshed before the request;
//! - a `401 Unauthorized` ends the session with
//!   [`LogoutReason::Unauthorized`] and redirects to the login page.

use dealgate_session::{LogoutReason, SessionController};
use dealgate_transport::{HttpConfig, HttpRefreshClient, RefreshTransport};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::DealgateError;

/// JSON client for `{api_base}/...` endpoints.
///
/// Cloning is cheap: the connection pool and the session are shared.
pub struct ApiClient<T = HttpRefreshClient> {
    http: Client,
    config: HttpConfig,
    session: SessionController<T>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            config: self.config.clone(),
            session: self.session.clone(),
        }
    }
}

impl<T: RefreshTransport> ApiClient<T> {
    /// Builds a client with its own connection pool.
    ///
    /// # Errors
    /// [`DealgateError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: HttpConfig, session: SessionController<T>) -> Result<Self, DealgateError> {
        let http = config.build_client()?;
        Ok(Self::with_client(http, config, session))
    }

    /// Uses an existing `reqwest::Client`.
    pub fn with_client(http: Client, config: HttpConfig, session: SessionController<T>) -> Self {
        Self {
            http,
            config,
            session,
        }
    }

    pub fn session(&self) -> &SessionController<T> {
        &self.session
    }

    /// `GET {api_base}/{path}`, decoding a JSON response.
    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, DealgateError> {
        let resp = self.execute(Method::GET, path, None::<&()>).await?;
        Ok(resp.json().await?)
    }

    /// `POST` with a JSON body, decoding a JSON response.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, DealgateError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self.execute(Method::POST, path, Some(body)).await?;
        Ok(resp.json().await?)
    }

    /// `PUT` with a JSON body, decoding a JSON response.
    pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, DealgateError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self.execute(Method::PUT, path, Some(body)).await?;
        Ok(resp.json().await?)
    }

    /// `DELETE`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), DealgateError> {
        self.execute(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    /// Sends one authenticated request and maps the status.
    ///
    /// # Errors
    /// - [`DealgateError::NotAuthenticated`] with no stored session (no
    ///   request is sent).
    /// - [`DealgateError::Unauthorized`] on 401, after ending the session.
    /// - [`DealgateError::Status`] on any other non-2xx.
    /// - [`DealgateError::Http`] if the request could not be sent.
    pub async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, DealgateError>
    where
        B: Serialize + ?Sized,
    {
        let token = self
            .session
            .fresh_access_token()
            .await
            .ok_or(DealgateError::NotAuthenticated)?;
        let url = self.config.endpoint(path)?;

        tracing::debug!(%method, path, "API request");
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request.send().await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "API rejected access token, ending session");
            self.session.force_logout(LogoutReason::Unauthorized);
            return Err(DealgateError::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DealgateError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}
