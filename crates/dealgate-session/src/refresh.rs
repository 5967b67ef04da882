//! Proactive access-token refresh.
//!
//! The [`RefreshScheduler`] keeps exactly one timer per tab, set to fire
//! `refresh_lead` before the current access token's `exp`. When it fires
//! (or when a caller asks explicitly) the scheduler exchanges the refresh
//! token for a new access token and re-arms itself from the new `exp`.
//!
//! ```text
//!             schedule_for()            timer fires / refresh_now()
//!   Idle ───────────────────→ Scheduled ───────────────────────────→ Refreshing
//!    ↑                                                                  │
//!    ├──────────── success (re-armed → Scheduled) ◄─────────────────────┤
//!    │                                                                  ▼
//!    └──────────────────────── cancel() ◄────────────────────────── Failed
//! ```
//!
//! # Single flight
//!
//! At most one refresh request is in flight per tab. The flag is claimed
//! with a compare-exchange and released by a guard's `Drop`, so it is
//! cleared on every exit path: success, error, panic, or the refresh
//! future being dropped mid-request.
//!
//! An explicit caller that loses the race gets `InFlight` straight away.
//! The timer and visibility paths call [`RefreshScheduler::run_or_join`]
//! instead, which waits for the running attempt and reports its outcome,
//! so a failed refresh started by anyone still ends the session. The guard
//! publishes the outcome on a `watch` channel after releasing the flag.
//!
//! # Timer callbacks
//!
//! A timer callback only spawns the refresh as its own task. Re-arming or
//! cancelling the timer later cannot abort a request that already started.
//! Each arm bumps an epoch, and a callback whose epoch is stale does
//! nothing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

use dealgate_timer::{Clock, TimerHandle, Timers};
use dealgate_token::{RefreshRequest, expiration_of};
use dealgate_transport::RefreshTransport;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::session::{LogoutHook, LogoutReason, SessionEvent};
use crate::store::TokenStore;

// ---------------------------------------------------------------------------
// RefreshState / RefreshOutcome
// ---------------------------------------------------------------------------

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// No timer armed, no request running.
    Idle,
    /// A timer is armed for `at` (wall clock).
    Scheduled { at: SystemTime },
    /// A refresh request is in flight.
    Refreshing,
    /// The last refresh request failed. A timer armed before it stays
    /// armed.
    Failed,
}

/// What a single refresh attempt did.
///
/// Public callers only see `Refreshed` as `true` and everything else as
/// `false`. The distinction matters to the timer path, which ends the
/// session on `MissingRefreshToken` and `Failed` but not on the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New tokens stored and the next refresh scheduled.
    Refreshed,
    /// Another refresh was already running. No request was sent.
    InFlight,
    /// No session or no refresh token to send.
    MissingRefreshToken,
    /// The endpoint failed or could not be reached. Store unchanged.
    Failed,
    /// The session was replaced or cleared while the request ran. The
    /// response was discarded.
    Superseded,
}

// ---------------------------------------------------------------------------
// Single-flight guard
// ---------------------------------------------------------------------------

/// Last finished attempt. `None` when the attempt was dropped before it
/// reached an outcome.
type Finished = watch::Sender<Option<RefreshOutcome>>;

struct FlightGuard<'a> {
    flag: &'a AtomicBool,
    finished: &'a Finished,
    outcome: Option<RefreshOutcome>,
}

impl<'a> FlightGuard<'a> {
    fn claim(flag: &'a AtomicBool, finished: &'a Finished) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag,
                finished,
                outcome: None,
            })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Release before publishing: a waiter that saw the flag held is
        // then guaranteed to see this publish as a change.
        self.flag.store(false, Ordering::Release);
        self.finished.send_replace(self.outcome);
    }
}

/// New tokens that made it into the store.
struct Renewed {
    access_token: String,
    user_id: String,
    generation: u64,
}

// ---------------------------------------------------------------------------
// RefreshScheduler
// ---------------------------------------------------------------------------

struct Slot {
    timer: Option<TimerHandle>,
    epoch: u64,
    state: RefreshState,
}

pub(crate) struct RefreshScheduler<T> {
    transport: T,
    store: Arc<TokenStore>,
    timers: Arc<dyn Timers>,
    clock: Arc<dyn Clock>,
    lead: Duration,
    in_flight: AtomicBool,
    finished: Finished,
    slot: Mutex<Slot>,
    events: broadcast::Sender<SessionEvent>,
    on_failure: LogoutHook,
    this: Weak<Self>,
}

impl<T: RefreshTransport> RefreshScheduler<T> {
    pub(crate) fn new(
        transport: T,
        store: Arc<TokenStore>,
        timers: Arc<dyn Timers>,
        clock: Arc<dyn Clock>,
        lead: Duration,
        events: broadcast::Sender<SessionEvent>,
        on_failure: LogoutHook,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            transport,
            store,
            timers,
            clock,
            lead,
            in_flight: AtomicBool::new(false),
            finished: watch::channel(None).0,
            slot: Mutex::new(Slot {
                timer: None,
                epoch: 0,
                state: RefreshState::Idle,
            }),
            events,
            on_failure,
            this: this.clone(),
        })
    }

    pub(crate) fn state(&self) -> RefreshState {
        self.slot.lock().state
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Arms the refresh timer for `access_token`, replacing any armed
    /// timer.
    ///
    /// The timer fires `lead` before the token's `exp`. A token that is
    /// already inside the lead, or has no readable `exp`, gets a
    /// zero-delay timer.
    pub(crate) fn schedule_for(&self, access_token: &str) {
        let now = self.clock.now();
        let delay = match expiration_of(access_token) {
            Some(exp) => exp
                .checked_sub(self.lead)
                .and_then(|at| at.duration_since(now).ok())
                .unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        };
        let at = now.checked_add(delay).unwrap_or(now);

        tracing::debug!(delay_ms = delay.as_millis() as u64, "refresh scheduled");
        self.arm(delay, at);
    }

    /// Disarms the timer and returns to `Idle`. A request already in flight
    /// keeps running; its result is discarded if the store was cleared.
    pub(crate) fn cancel(&self) {
        let disarmed = {
            let mut slot = self.slot.lock();
            slot.epoch += 1;
            slot.state = RefreshState::Idle;
            slot.timer.take()
        };
        if disarmed.is_some() {
            tracing::debug!("refresh timer cancelled");
        }
    }

    /// Refreshes now. `true` only if new tokens were stored.
    pub(crate) async fn refresh_now(&self) -> bool {
        self.run().await == RefreshOutcome::Refreshed
    }

    /// One refresh attempt, single-flight. Returns `InFlight` at once if
    /// another attempt holds the guard.
    pub(crate) async fn run(&self) -> RefreshOutcome {
        let Some(mut flight) = FlightGuard::claim(&self.in_flight, &self.finished) else {
            tracing::debug!("refresh already in flight, skipping");
            return RefreshOutcome::InFlight;
        };

        let (outcome, renewed) = self.attempt().await;
        flight.outcome = Some(outcome);
        drop(flight);

        // Re-armed only after the guard is gone, so a zero-delay timer for
        // an already-expiring token finds the flag free.
        if let Some(renewed) = renewed {
            if self.store.generation() == renewed.generation {
                self.schedule_for(&renewed.access_token);
            }
            let _ = self.events.send(SessionEvent::Refreshed {
                user_id: renewed.user_id,
            });
        }
        outcome
    }

    /// Like [`run`](Self::run), but if another attempt is running, waits
    /// for it and returns its outcome. Never returns `InFlight` while the
    /// scheduler is alive.
    pub(crate) async fn run_or_join(&self) -> RefreshOutcome {
        loop {
            // Subscribed before trying the guard, so the holder's publish
            // cannot be missed.
            let mut finished = self.finished.subscribe();
            let outcome = self.run().await;
            if outcome != RefreshOutcome::InFlight {
                return outcome;
            }

            tracing::debug!("waiting for the running refresh");
            if finished.changed().await.is_err() {
                return RefreshOutcome::InFlight;
            }
            let last = *finished.borrow_and_update();
            if let Some(outcome) = last {
                return outcome;
            }
            tracing::debug!("running refresh was abandoned, retrying");
        }
    }

    async fn attempt(&self) -> (RefreshOutcome, Option<Renewed>) {
        let Some((session, generation)) = self.store.read_versioned() else {
            tracing::debug!("no stored session to refresh");
            return (RefreshOutcome::MissingRefreshToken, None);
        };
        let Some(refresh_token) = session.refresh_token else {
            tracing::debug!(user_id = %session.user_id, "no refresh token stored");
            return (RefreshOutcome::MissingRefreshToken, None);
        };

        self.set_state(RefreshState::Refreshing);
        let result = self
            .transport
            .refresh(RefreshRequest { refresh_token })
            .await;

        match result {
            Ok(response) => {
                let applied = self.store.replace_tokens(
                    generation,
                    &response.access_token,
                    response.refresh_token.as_deref(),
                );
                self.settle(RefreshState::Idle);
                if !applied {
                    tracing::info!(
                        user_id = %session.user_id,
                        "session changed during refresh, discarding new tokens"
                    );
                    return (RefreshOutcome::Superseded, None);
                }

                tracing::info!(
                    user_id = %session.user_id,
                    rotated = response.refresh_token.is_some(),
                    "access token refreshed"
                );
                let renewed = Renewed {
                    access_token: response.access_token,
                    user_id: session.user_id,
                    generation: generation + 1,
                };
                (RefreshOutcome::Refreshed, Some(renewed))
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "access token refresh failed");
                self.settle(RefreshState::Failed);
                (RefreshOutcome::Failed, None)
            }
        }
    }

    // -- internals ----------------------------------------------------------

    fn arm(&self, delay: Duration, at: SystemTime) {
        let epoch = {
            let mut slot = self.slot.lock();
            slot.epoch += 1;
            slot.epoch
        };

        let this = self.this.clone();
        let handle = self.timers.after(
            delay,
            Box::new(move || {
                if let Some(scheduler) = this.upgrade() {
                    scheduler.fire(epoch);
                }
            }),
        );

        let replaced = {
            let mut slot = self.slot.lock();
            if slot.epoch != epoch {
                // Re-armed or cancelled while we were arming; `handle`
                // drops here and cancels itself.
                return;
            }
            slot.state = RefreshState::Scheduled { at };
            slot.timer.replace(handle)
        };
        drop(replaced);
    }

    fn fire(self: Arc<Self>, epoch: u64) {
        let fired = {
            let mut slot = self.slot.lock();
            if slot.epoch != epoch {
                tracing::debug!("stale refresh timer ignored");
                return;
            }
            if matches!(slot.state, RefreshState::Scheduled { .. }) {
                slot.state = RefreshState::Idle;
            }
            slot.timer.take()
        };
        drop(fired);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(self.run_scheduled());
            }
            Err(e) => tracing::warn!(error = %e, "refresh timer fired outside a tokio runtime"),
        }
    }

    async fn run_scheduled(self: Arc<Self>) {
        let outcome = self.run_or_join().await;
        match outcome {
            RefreshOutcome::MissingRefreshToken | RefreshOutcome::Failed => {
                tracing::warn!(?outcome, "scheduled refresh failed, ending session");
                (self.on_failure)(LogoutReason::RefreshFailed);
            }
            RefreshOutcome::Refreshed | RefreshOutcome::InFlight | RefreshOutcome::Superseded => {
                tracing::debug!(?outcome, "scheduled refresh finished");
            }
        }
    }

    fn set_state(&self, state: RefreshState) {
        self.slot.lock().state = state;
    }

    /// Leaves `Refreshing` for `state`, unless something else (a new
    /// schedule, a cancel) already moved the state on.
    fn settle(&self, state: RefreshState) {
        let mut slot = self.slot.lock();
        if slot.state == RefreshState::Refreshing {
            slot.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::OnceLock;
    use std::sync::atomic::AtomicUsize;
    use std::time::UNIX_EPOCH;

    use dealgate_timer::{TimerCallback, TimerId};
    use dealgate_token::{RefreshResponse, Role, Session};
    use dealgate_transport::TransportError;
    use tokio::sync::Notify;

    use super::*;

    /// Records requested delays without ever firing.
    #[derive(Default)]
    struct RecordingTimers {
        delays: Mutex<Vec<Duration>>,
    }

    impl Timers for RecordingTimers {
        fn after(&self, delay: Duration, _callback: TimerCallback) -> TimerHandle {
            let mut delays = self.delays.lock();
            delays.push(delay);
            TimerHandle::new(TimerId::new(delays.len() as u64), || {})
        }
    }

    /// Notes, at every arm, whether the scheduler's single-flight flag
    /// was held.
    #[derive(Default)]
    struct FlagWatchingTimers {
        scheduler: OnceLock<Weak<RefreshScheduler<Arc<Scripted>>>>,
        held_at_arm: Mutex<Vec<bool>>,
    }

    impl Timers for FlagWatchingTimers {
        fn after(&self, _delay: Duration, _callback: TimerCallback) -> TimerHandle {
            let held = self
                .scheduler
                .get()
                .and_then(Weak::upgrade)
                .is_some_and(|scheduler| scheduler.is_refreshing());
            let mut log = self.held_at_arm.lock();
            log.push(held);
            TimerHandle::new(TimerId::new(log.len() as u64), || {})
        }
    }

    struct FixedClock(SystemTime);

    impl Clock for FixedClock {
        fn now(&self) -> SystemTime {
            self.0
        }
    }

    /// Pops scripted responses; optionally waits on `gate` first.
    #[derive(Default)]
    struct Scripted {
        responses: Mutex<VecDeque<Result<RefreshResponse, TransportError>>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl RefreshTransport for Scripted {
        async fn refresh(
            &self,
            _request: RefreshRequest,
        ) -> Result<RefreshResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Err(TransportError::Status(503)))
        }
    }

    fn token_expiring_at(secs: u64) -> String {
        crate::tests::token_with_exp(secs)
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn scheduler(
        transport: Scripted,
        store: Arc<TokenStore>,
        now: u64,
    ) -> (Arc<RefreshScheduler<Arc<Scripted>>>, Arc<Scripted>, Arc<RecordingTimers>) {
        let transport = Arc::new(transport);
        let timers = Arc::new(RecordingTimers::default());
        let (events, _) = broadcast::channel(8);
        let scheduler = RefreshScheduler::new(
            Arc::clone(&transport),
            store,
            timers.clone(),
            Arc::new(FixedClock(at(now))),
            Duration::from_secs(120),
            events,
            Arc::new(|_: LogoutReason| {}),
        );
        (scheduler, transport, timers)
    }

    fn stored_session(access: &str, refresh: Option<&str>) -> Arc<TokenStore> {
        let store = Arc::new(TokenStore::new());
        let mut session = Session::new(access, "u-1", Role::Buyer);
        session.refresh_token = refresh.map(str::to_string);
        store.write(&session);
        store
    }

    #[test]
    fn test_schedule_for_arms_timer_lead_before_exp() {
        let store = Arc::new(TokenStore::new());
        let (scheduler, _, timers) = scheduler(Scripted::default(), store, 1_000);

        scheduler.schedule_for(&token_expiring_at(1_300));

        assert_eq!(*timers.delays.lock(), vec![Duration::from_secs(180)]);
        assert_eq!(
            scheduler.state(),
            RefreshState::Scheduled { at: at(1_180) }
        );
    }

    #[test]
    fn test_schedule_for_inside_lead_uses_zero_delay() {
        let store = Arc::new(TokenStore::new());
        let (scheduler, _, timers) = scheduler(Scripted::default(), store, 1_000);

        scheduler.schedule_for(&token_expiring_at(1_060));
        scheduler.schedule_for("not-a-jwt");

        assert_eq!(*timers.delays.lock(), vec![Duration::ZERO, Duration::ZERO]);
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let store = Arc::new(TokenStore::new());
        let (scheduler, _, _) = scheduler(Scripted::default(), store, 1_000);
        scheduler.schedule_for(&token_expiring_at(2_000));

        scheduler.cancel();

        assert_eq!(scheduler.state(), RefreshState::Idle);
    }

    #[tokio::test]
    async fn test_run_without_refresh_token_sends_nothing() {
        let store = stored_session("a-1", None);
        let (scheduler, transport, _) = scheduler(Scripted::default(), store, 1_000);

        assert_eq!(scheduler.run().await, RefreshOutcome::MissingRefreshToken);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_success_stores_tokens_and_reschedules() {
        let new_access = token_expiring_at(1_300);
        let transport = Scripted::default();
        transport.responses.lock().push_back(Ok(RefreshResponse {
            access_token: new_access.clone(),
            refresh_token: Some("r-2".into()),
        }));
        let store = stored_session("a-1", Some("r-1"));
        let (scheduler, _, timers) = scheduler(transport, Arc::clone(&store), 1_000);

        assert_eq!(scheduler.run().await, RefreshOutcome::Refreshed);

        let session = store.read().unwrap();
        assert_eq!(session.access_token, new_access);
        assert_eq!(session.refresh_token.as_deref(), Some("r-2"));
        assert_eq!(*timers.delays.lock(), vec![Duration::from_secs(180)]);
        assert!(!scheduler.is_refreshing());
    }

    #[tokio::test]
    async fn test_run_failure_leaves_store_and_sets_failed() {
        let store = stored_session("a-1", Some("r-1"));
        let before = store.read();
        let (scheduler, _, _) = scheduler(Scripted::default(), Arc::clone(&store), 1_000);

        assert_eq!(scheduler.run().await, RefreshOutcome::Failed);

        assert_eq!(store.read(), before);
        assert_eq!(scheduler.state(), RefreshState::Failed);
        assert!(!scheduler.is_refreshing());
    }

    #[tokio::test]
    async fn test_run_while_in_flight_returns_in_flight_without_request() {
        let gate = Arc::new(Notify::new());
        let transport = Scripted {
            gate: Some(Arc::clone(&gate)),
            ..Scripted::default()
        };
        let store = stored_session("a-1", Some("r-1"));
        let (scheduler, transport, _) = scheduler(transport, store, 1_000);

        let first = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run().await }
        });
        while !scheduler.is_refreshing() || transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(scheduler.run().await, RefreshOutcome::InFlight);
        gate.notify_one();
        assert_eq!(first.await.unwrap(), RefreshOutcome::Failed);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_cancelled_mid_request_releases_guard() {
        let gate = Arc::new(Notify::new());
        let transport = Scripted {
            gate: Some(gate),
            ..Scripted::default()
        };
        let store = stored_session("a-1", Some("r-1"));
        let (scheduler, _, _) = scheduler(transport, store, 1_000);

        let task = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run().await }
        });
        while !scheduler.is_refreshing() {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;

        assert!(!scheduler.is_refreshing());
    }

    #[tokio::test]
    async fn test_run_after_store_cleared_is_superseded() {
        let gate = Arc::new(Notify::new());
        let transport = Scripted {
            gate: Some(Arc::clone(&gate)),
            ..Scripted::default()
        };
        transport.responses.lock().push_back(Ok(RefreshResponse {
            access_token: "a-2".into(),
            refresh_token: None,
        }));
        let store = stored_session("a-1", Some("r-1"));
        let (scheduler, transport, _) = scheduler(transport, Arc::clone(&store), 1_000);

        let task = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run().await }
        });
        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        store.clear(Some(Role::Buyer));
        gate.notify_one();

        assert_eq!(task.await.unwrap(), RefreshOutcome::Superseded);
        assert_eq!(store.read(), None);
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn test_run_rearms_only_after_releasing_guard() {
        let transport = Arc::new(Scripted::default());
        // Already inside the 120s lead: the re-arm is a zero-delay timer.
        transport.responses.lock().push_back(Ok(RefreshResponse {
            access_token: token_expiring_at(1_060),
            refresh_token: None,
        }));
        let timers = Arc::new(FlagWatchingTimers::default());
        let (events, _) = broadcast::channel(8);
        let scheduler = RefreshScheduler::new(
            Arc::clone(&transport),
            stored_session("a-1", Some("r-1")),
            timers.clone(),
            Arc::new(FixedClock(at(1_000))),
            Duration::from_secs(120),
            events,
            Arc::new(|_: LogoutReason| {}),
        );
        let _ = timers.scheduler.set(Arc::downgrade(&scheduler));

        assert_eq!(scheduler.run().await, RefreshOutcome::Refreshed);

        assert_eq!(*timers.held_at_arm.lock(), vec![false]);
        assert_eq!(scheduler.state(), RefreshState::Scheduled { at: at(1_000) });
    }

    #[tokio::test]
    async fn test_run_or_join_while_in_flight_returns_running_outcome() {
        let gate = Arc::new(Notify::new());
        let transport = Scripted {
            gate: Some(Arc::clone(&gate)),
            ..Scripted::default()
        };
        let store = stored_session("a-1", Some("r-1"));
        let (scheduler, transport, _) = scheduler(transport, store, 1_000);

        let first = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run().await }
        });
        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let joined = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_or_join().await }
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!joined.is_finished());

        gate.notify_one();

        assert_eq!(first.await.unwrap(), RefreshOutcome::Failed);
        assert_eq!(joined.await.unwrap(), RefreshOutcome::Failed);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_or_join_after_abandoned_attempt_runs_its_own() {
        let gate = Arc::new(Notify::new());
        let transport = Scripted {
            gate: Some(Arc::clone(&gate)),
            ..Scripted::default()
        };
        transport.responses.lock().push_back(Ok(RefreshResponse {
            access_token: token_expiring_at(1_300),
            refresh_token: None,
        }));
        let store = stored_session("a-1", Some("r-1"));
        let (scheduler, transport, _) = scheduler(transport, store, 1_000);

        let abandoned = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run().await }
        });
        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let joined = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.run_or_join().await }
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        abandoned.abort();
        let _ = abandoned.await;
        gate.notify_one();

        assert_eq!(joined.await.unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
