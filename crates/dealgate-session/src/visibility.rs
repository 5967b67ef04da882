//! Re-validation when a tab comes back to the foreground.
//!
//! Timers in a background tab can be throttled or frozen, so a tab that
//! was hidden for an hour may hold a token that expired long ago without
//! its refresh timer having fired. When the tab becomes visible again the
//! session is checked once, directly against the clock.

use std::time::{Duration, SystemTime};

use dealgate_token::is_expired_or_expiring;
use dealgate_transport::RefreshTransport;
use parking_lot::Mutex;

use crate::refresh::{RefreshOutcome, RefreshScheduler};
use crate::session::{LogoutReason, Visibility};
use crate::store::TokenStore;

/// What a visibility change led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Not a hidden-to-visible transition, or no session was active.
    Skipped,
    /// The stored token is still valid.
    Valid,
    /// The token had expired and was refreshed.
    Refreshed,
    /// The session ended for the given reason.
    LoggedOut(LogoutReason),
}

/// Tracks the last visibility and decides what a transition means.
#[derive(Debug, Default)]
pub(crate) struct VisibilityReconciler {
    last: Mutex<Visibility>,
}

impl VisibilityReconciler {
    /// Records `next` and reports whether this was a hidden-to-visible
    /// transition.
    pub(crate) fn transition(&self, next: Visibility) -> bool {
        let mut last = self.last.lock();
        let regained = *last == Visibility::Hidden && next == Visibility::Visible;
        *last = next;
        regained
    }

    /// Checks the stored session against `now`. Does not log out by
    /// itself; a `LoggedOut` result tells the caller to.
    pub(crate) async fn reconcile<T: RefreshTransport>(
        &self,
        store: &TokenStore,
        refresh: &RefreshScheduler<T>,
        now: SystemTime,
    ) -> Reconciliation {
        let Some(session) = store.read() else {
            tracing::info!("tab visible again but session is gone");
            return Reconciliation::LoggedOut(LogoutReason::SessionEnded);
        };

        if !is_expired_or_expiring(&session.access_token, Duration::ZERO, now) {
            return Reconciliation::Valid;
        }

        // A refresh someone else already started is waited for; its
        // failure ends the session here like our own would.
        tracing::info!(user_id = %session.user_id, "tab visible again with expired token, refreshing");
        match refresh.run_or_join().await {
            RefreshOutcome::Refreshed => Reconciliation::Refreshed,
            RefreshOutcome::Superseded | RefreshOutcome::InFlight => Reconciliation::Skipped,
            RefreshOutcome::MissingRefreshToken | RefreshOutcome::Failed => {
                Reconciliation::LoggedOut(LogoutReason::SessionExpired)
            }
        }
    }
}
