//! The production stack for one tab context, assembled.

use std::sync::Arc;

use dealgate_session::{MemoryStorage, Navigator, SessionController};
use dealgate_timer::{SystemClock, TokioTimers};
use dealgate_transport::HttpRefreshClient;

use crate::DealgateError;
use crate::api::ApiClient;
use crate::bootstrap::from_redirect_url;
use crate::config::DealgateConfig;

/// A session controller wired to the real refresh endpoint, plus an API
/// client sharing its session.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use dealgate::prelude::*;
///
/// # async fn run() -> Result<(), DealgateError> {
/// let runtime = SessionRuntime::builder()
///     .config(DealgateConfig::from_file("dealgate.json")?)
///     .navigator(Arc::new(|path: &str| println!("go to {path}")))
///     .build()?;
///
/// runtime.bootstrap("https://app.example.com/?token=eyJ...&userId=u-1&role=buyer")?;
/// let status = runtime.session().initialize().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionRuntime {
    session: SessionController<HttpRefreshClient>,
    api: ApiClient<HttpRefreshClient>,
}

impl SessionRuntime {
    pub fn builder() -> SessionRuntimeBuilder {
        SessionRuntimeBuilder::default()
    }

    pub fn session(&self) -> &SessionController<HttpRefreshClient> {
        &self.session
    }

    pub fn api(&self) -> &ApiClient<HttpRefreshClient> {
        &self.api
    }

    /// Logs in from a login redirect URL, if it carries a session.
    /// Returns whether it did.
    ///
    /// # Errors
    /// See [`from_redirect_url`].
    pub fn bootstrap(&self, url: &str) -> Result<bool, DealgateError> {
        match from_redirect_url(url)? {
            Some(session) => {
                self.session.login_session(session);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Builder for [`SessionRuntime`].
#[derive(Default)]
pub struct SessionRuntimeBuilder {
    config: DealgateConfig,
    storage: Option<MemoryStorage>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl SessionRuntimeBuilder {
    pub fn config(mut self, config: DealgateConfig) -> Self {
        self.config = config;
        self
    }

    /// Storage left by an earlier page load in this tab.
    pub fn storage(mut self, storage: MemoryStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Builds the stack: `HttpRefreshClient`, tokio timers on the current
    /// runtime, the system clock, and in-memory tab storage.
    ///
    /// # Errors
    /// - [`DealgateError::Transport`] for an unusable `api_base` or HTTP
    ///   client.
    /// - [`DealgateError::Timer`] when called outside a tokio runtime.
    pub fn build(self) -> Result<SessionRuntime, DealgateError> {
        let config = self.config.validated();
        let http = config.http.build_client()?;
        let transport = HttpRefreshClient::with_client(http.clone(), &config.http.api_base)?;

        let mut builder = SessionController::builder(transport)
            .config(config.session)
            .timers(Arc::new(TokioTimers::try_current()?))
            .clock(Arc::new(SystemClock))
            .storage(self.storage.unwrap_or_default());
        if let Some(navigator) = self.navigator {
            builder = builder.navigator(navigator);
        }
        let session = builder.build()?;

        tracing::info!(api_base = %config.http.api_base, "session runtime ready");
        Ok(SessionRuntime {
            api: ApiClient::with_client(http, config.http, session.clone()),
            session,
        })
    }
}
