//! The session controller: one tab's session, end to end.
//!
//! [`SessionController`] is the only type hosts need to hold. It owns the
//! token store, the refresh scheduler and the inactivity monitor, and it
//! is the single place where a session starts and ends.
//!
//! # Lifecycle
//!
//! ```text
//!                 login()                        timer / refresh_access_token()
//!   anonymous ─────────────→ authenticated ───────────────────────────→ refreshing
//!       ↑                       │     ↑                                      │
//!       │                       │     └───────────── success ────────────────┤
//!       │   logout() /          │                                            │
//!       │   force_logout()      ▼                                            ▼
//!       └──────────────── logged out ◄──────── timer-driven failure ───── failed
//! ```
//!
//! # Ownership
//!
//! The controller is a cheap handle around an `Arc`. Timers and the
//! refresh scheduler reach back into it through a `Weak`, so when the last
//! handle is dropped every pending timer is cancelled with it.

use std::sync::{Arc, Weak};

use dealgate_timer::{Clock, SystemClock, Timers, TokioTimers};
use dealgate_token::{Role, Session, is_expired_or_expiring};
use dealgate_transport::RefreshTransport;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::SessionError;
use crate::config::{ActivitySignal, SessionConfig};
use crate::inactivity::InactivityMonitor;
use crate::navigator::{LogNavigator, Navigator};
use crate::refresh::{RefreshOutcome, RefreshScheduler, RefreshState};
use crate::session::{AuthStatus, LogoutHook, LogoutReason, SessionEvent, Visibility};
use crate::storage::TabStorage;
use crate::store::TokenStore;
use crate::visibility::{Reconciliation, VisibilityReconciler};

/// Capacity of the lifecycle event channel. Slow subscribers see
/// `RecvError::Lagged` rather than blocking the session.
const EVENT_CAPACITY: usize = 32;

struct Lifecycle {
    /// Whether the tab believes it has a live session. Set by login and
    /// resume, cleared by every logout.
    active: bool,
    /// Role of the last session, kept after the store is cleared so a
    /// late logout still knows which login page to use.
    last_role: Option<Role>,
}

struct Inner<T> {
    config: SessionConfig,
    store: Arc<TokenStore>,
    refresh: Arc<RefreshScheduler<T>>,
    inactivity: Arc<InactivityMonitor>,
    visibility: VisibilityReconciler,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    events: broadcast::Sender<SessionEvent>,
    lifecycle: Mutex<Lifecycle>,
}

/// One tab's session.
///
/// Cloning is cheap; every clone drives the same session.
///
/// # Example
///
/// ```rust,no_run
/// use dealgate_session::{SessionController, SessionConfig};
/// use dealgate_token::Role;
/// use dealgate_transport::{HttpConfig, HttpRefreshClient};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpRefreshClient::new(&HttpConfig::default())?;
/// let session = SessionController::builder(transport)
///     .config(SessionConfig::default())
///     .build()?;
///
/// session.login("eyJ...", "u-42", Role::Buyer, Some("refresh".into()));
/// assert!(session.is_active());
/// # Ok(())
/// # }
/// ```
pub struct SessionController<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SessionController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: RefreshTransport> SessionController<T> {
    /// Starts building a controller around `transport`.
    pub fn builder(transport: T) -> SessionControllerBuilder<T> {
        SessionControllerBuilder::new(transport)
    }

    // -- session start ------------------------------------------------------

    /// Starts a session: stores it, schedules the first refresh and starts
    /// the inactivity window.
    ///
    /// Logging in over an existing session replaces it.
    pub fn login(
        &self,
        access_token: impl Into<String>,
        user_id: impl Into<String>,
        role: Role,
        refresh_token: Option<String>,
    ) {
        self.login_session(Session {
            access_token: access_token.into(),
            refresh_token,
            user_id: user_id.into(),
            role,
        });
    }

    /// [`login`](Self::login) for an already assembled [`Session`], e.g.
    /// one parsed from a login redirect.
    pub fn login_session(&self, session: Session) {
        let inner = &self.inner;
        inner.store.write(&session);
        inner.refresh.schedule_for(&session.access_token);
        self.activate(session.role);

        tracing::info!(user_id = %session.user_id, role = %session.role, "logged in");
        let _ = inner.events.send(SessionEvent::LoggedIn {
            user_id: session.user_id,
            role: session.role,
        });
    }

    /// Resumes whatever this tab stored before, at startup.
    ///
    /// A stored token that is expired or inside the refresh lead gets one
    /// refresh attempt. If that fails the stored session is dropped
    /// quietly, without a redirect: the host shows its logged-out view.
    pub async fn initialize(&self) -> AuthStatus {
        let inner = &self.inner;
        let Some(session) = inner.store.read() else {
            tracing::debug!("no stored session");
            return AuthStatus::anonymous();
        };

        let now = inner.clock.now();
        if !is_expired_or_expiring(&session.access_token, inner.config.refresh_lead(), now) {
            inner.refresh.schedule_for(&session.access_token);
            self.activate(session.role);
            tracing::info!(user_id = %session.user_id, role = %session.role, "stored session resumed");
            return self.check_auth();
        }

        tracing::info!(user_id = %session.user_id, "stored session expiring, refreshing before resume");
        match inner.refresh.run_or_join().await {
            RefreshOutcome::Refreshed => {
                self.activate(session.role);
                tracing::info!(user_id = %session.user_id, role = %session.role, "stored session resumed");
            }
            RefreshOutcome::Superseded => {
                tracing::debug!("session replaced during startup refresh");
            }
            outcome @ (RefreshOutcome::InFlight
            | RefreshOutcome::MissingRefreshToken
            | RefreshOutcome::Failed) => {
                tracing::info!(?outcome, "stored session could not be refreshed, clearing");
                inner.refresh.cancel();
                inner.store.clear(None);
            }
        }
        self.check_auth()
    }

    // -- session end --------------------------------------------------------

    /// Ends the session. With `redirect`, sends the tab to the role's login
    /// page.
    pub fn logout(&self, redirect: bool) {
        self.end_session(LogoutReason::UserInitiated, redirect);
    }

    /// Ends the session and redirects to the login page. `reason` is for
    /// logs and subscribers.
    pub fn force_logout(&self, reason: LogoutReason) {
        self.end_session(reason, true);
    }

    // -- queries ------------------------------------------------------------

    /// Whether the stored access token is valid right now. Never refreshes.
    pub fn check_auth(&self) -> AuthStatus {
        let inner = &self.inner;
        match inner.store.read() {
            None => AuthStatus::anonymous(),
            Some(session) => AuthStatus {
                authenticated: !is_expired_or_expiring(
                    &session.access_token,
                    std::time::Duration::ZERO,
                    inner.clock.now(),
                ),
                role: Some(session.role),
                user_id: Some(session.user_id),
            },
        }
    }

    /// The stored access token, for `Authorization: Bearer` headers.
    pub fn access_token(&self) -> Option<String> {
        self.inner.store.read().map(|s| s.access_token)
    }

    /// The access token to send with the next API call.
    ///
    /// If the stored token is inside the refresh lead it is refreshed
    /// first, or the refresh already running is waited for. When that
    /// refresh fails the stored token is returned as is and the API
    /// decides.
    pub async fn fresh_access_token(&self) -> Option<String> {
        let token = self.access_token()?;
        let now = self.inner.clock.now();
        if is_expired_or_expiring(&token, self.inner.config.refresh_lead(), now)
            && self.inner.refresh.run_or_join().await == RefreshOutcome::Refreshed
        {
            return self.access_token();
        }
        Some(token)
    }

    /// Whether the tab believes it has a live session.
    pub fn is_active(&self) -> bool {
        self.inner.lifecycle.lock().active
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.inner.refresh.state()
    }

    /// Whether a refresh request is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The token store backing this tab.
    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    // -- refresh, activity, visibility --------------------------------------

    /// Exchanges the refresh token for a new access token now.
    ///
    /// Returns `false` if a refresh is already in flight (no second request
    /// is sent), if there is no refresh token, or if the endpoint failed.
    /// A failure here never logs the user out.
    pub async fn refresh_access_token(&self) -> bool {
        self.inner.refresh.refresh_now().await
    }

    /// Feeds one user interaction to the inactivity monitor. Returns
    /// whether it restarted the window.
    pub fn record_activity(&self, signal: ActivitySignal) -> bool {
        self.inner.inactivity.observe(signal)
    }

    /// Feeds a tab visibility change. Only hidden-to-visible with an active
    /// session does anything.
    pub async fn handle_visibility(&self, visibility: Visibility) -> Reconciliation {
        let inner = &self.inner;
        if !inner.visibility.transition(visibility) || !self.is_active() {
            return Reconciliation::Skipped;
        }

        let result = inner
            .visibility
            .reconcile(&inner.store, &inner.refresh, inner.clock.now())
            .await;
        if let Reconciliation::LoggedOut(reason) = result {
            self.end_if_active(reason);
        }
        result
    }

    // -- internals ----------------------------------------------------------

    fn activate(&self, role: Role) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.active = true;
            lifecycle.last_role = Some(role);
        }
        self.inner.inactivity.arm();
    }

    fn end_session(&self, reason: LogoutReason, redirect: bool) {
        let inner = &self.inner;
        let stored_role = inner.store.read().map(|s| s.role);
        let role = {
            let mut lifecycle = inner.lifecycle.lock();
            lifecycle.active = false;
            let remembered = lifecycle.last_role.take();
            stored_role.or(remembered)
        };

        inner.refresh.cancel();
        inner.inactivity.disarm();
        inner.store.clear(None);

        tracing::info!(%reason, role = role.map(|r| r.as_str()), "logged out");
        let _ = inner.events.send(SessionEvent::LoggedOut { reason });

        if redirect {
            let destination = inner.config.login_routes.for_role(role);
            tracing::debug!(destination, "navigating to login");
            inner.navigator.navigate(destination);
        }
    }

    /// Entry point for timers and visibility checks. A session that already
    /// ended is left alone, so two paths racing to end it redirect once.
    fn end_if_active(&self, reason: LogoutReason) {
        if !self.is_active() {
            tracing::debug!(%reason, "session already ended");
            return;
        }
        self.force_logout(reason);
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`SessionController`].
///
/// Only the transport is required. Defaults: fresh in-memory storage,
/// [`SystemClock`], [`TokioTimers`] on the current runtime, and a
/// [`LogNavigator`].
pub struct SessionControllerBuilder<T> {
    transport: T,
    config: SessionConfig,
    store: Option<TokenStore>,
    timers: Option<Arc<dyn Timers>>,
    clock: Option<Arc<dyn Clock>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl<T: RefreshTransport> SessionControllerBuilder<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            config: SessionConfig::default(),
            store: None,
            timers: None,
            clock: None,
            navigator: None,
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Storage left by an earlier page load in this tab.
    pub fn storage(mut self, storage: impl TabStorage) -> Self {
        self.store = Some(TokenStore::with_storage(storage));
        self
    }

    pub fn timers(mut self, timers: Arc<dyn Timers>) -> Self {
        self.timers = Some(timers);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Builds the controller. The config is validated here.
    ///
    /// # Errors
    /// [`SessionError::Timers`] if no timers were given and there is no
    /// tokio runtime to create them on.
    pub fn build(self) -> Result<SessionController<T>, SessionError> {
        let timers: Arc<dyn Timers> = match self.timers {
            Some(timers) => timers,
            None => Arc::new(TokioTimers::try_current()?),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let navigator: Arc<dyn Navigator> = match self.navigator {
            Some(navigator) => navigator,
            None => Arc::new(LogNavigator),
        };
        let store = Arc::new(self.store.unwrap_or_default());
        let config = self.config.validated();
        let transport = self.transport;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new_cyclic(|weak: &Weak<Inner<T>>| {
            let hook: LogoutHook = {
                let weak = weak.clone();
                Arc::new(move |reason: LogoutReason| {
                    if let Some(inner) = weak.upgrade() {
                        SessionController { inner }.end_if_active(reason);
                    }
                })
            };

            Inner {
                refresh: RefreshScheduler::new(
                    transport,
                    Arc::clone(&store),
                    Arc::clone(&timers),
                    Arc::clone(&clock),
                    config.refresh_lead(),
                    events.clone(),
                    Arc::clone(&hook),
                ),
                inactivity: InactivityMonitor::new(
                    timers,
                    config.inactivity_window(),
                    config.activity_signals.clone(),
                    hook,
                ),
                visibility: VisibilityReconciler::default(),
                store,
                clock,
                navigator,
                events,
                lifecycle: Mutex::new(Lifecycle {
                    active: false,
                    last_role: None,
                }),
                config,
            }
        });

        Ok(SessionController { inner })
    }
}
