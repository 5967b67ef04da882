//! Shared harness for session integration tests.
//!
//! Time is tokio's paused clock. `TokioClock` anchors wall time at
//! [`START`], so a token "expiring at START + 300" expires five minutes
//! into the test, and refresh timers move with `tokio::time::advance`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dealgate_session::{
    MemoryStorage, RecordingNavigator, SessionConfig, SessionController,
};
use dealgate_timer::{TimerCallback, TimerHandle, TimerId, Timers, TokioClock};
use dealgate_token::{RefreshRequest, RefreshResponse};
use dealgate_transport::{RefreshTransport, TransportError};
use parking_lot::Mutex;

/// Wall time at which every test starts.
pub const START: u64 = 1_700_000_000;

/// A signed-looking token whose `exp` is `offset_secs` after [`START`].
pub fn token_expiring_at(offset_secs: u64) -> String {
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(format!(
            r#"{{"exp":{},"sub":"u-1","role":"buyer"}}"#,
            START + offset_secs
        )),
    )
}

/// Lets spawned timer and refresh tasks run to their next suspension.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Advances paused time by `secs`, then lets tasks run.
pub async fn advance_secs(secs: u64) {
    tokio::time::advance(Duration::from_secs(secs)).await;
    settle().await;
}

// =========================================================================
// Fake refresh endpoint
// =========================================================================

/// Scripted refresh endpoint. Pops one queued response per call and fails
/// with HTTP 503 once the queue is empty.
#[derive(Default)]
pub struct FakeRefresh {
    responses: Mutex<VecDeque<Result<RefreshResponse, TransportError>>>,
    sent: Mutex<Vec<String>>,
    calls: AtomicUsize,
    latency: Mutex<Duration>,
}

impl FakeRefresh {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a successful response.
    pub fn respond(&self, access_token: String, refresh_token: Option<&str>) {
        self.responses.lock().push_back(Ok(RefreshResponse {
            access_token,
            refresh_token: refresh_token.map(str::to_string),
        }));
    }

    /// Queues a failure with `status`.
    pub fn fail(&self, status: u16) {
        self.responses
            .lock()
            .push_back(Err(TransportError::Status(status)));
    }

    /// Every call sleeps this long before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Refresh tokens received, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

impl RefreshTransport for FakeRefresh {
    async fn refresh(&self, request: RefreshRequest) -> Result<RefreshResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().push(request.refresh_token);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(TransportError::Status(503)))
    }
}

// =========================================================================
// Frozen timers
// =========================================================================

/// Timers that never fire, like those of a throttled background tab.
#[derive(Default)]
pub struct FrozenTimers {
    armed: AtomicUsize,
}

impl Timers for FrozenTimers {
    fn after(&self, _delay: Duration, _callback: TimerCallback) -> TimerHandle {
        let id = self.armed.fetch_add(1, Ordering::SeqCst) as u64;
        TimerHandle::new(TimerId::new(id), || {})
    }
}

// =========================================================================
// Harness
// =========================================================================

pub struct Harness {
    pub session: SessionController<Arc<FakeRefresh>>,
    pub backend: Arc<FakeRefresh>,
    pub navigator: Arc<RecordingNavigator>,
}

pub struct HarnessBuilder {
    config: SessionConfig,
    storage: MemoryStorage,
    frozen: bool,
}

impl HarnessBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: MemoryStorage) -> Self {
        self.storage = storage;
        self
    }

    /// Use timers that never fire.
    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Must be called inside a (paused) tokio runtime.
    pub fn build(self) -> Harness {
        let backend = FakeRefresh::new();
        let navigator = Arc::new(RecordingNavigator::new());
        let mut builder = SessionController::builder(Arc::clone(&backend))
            .config(self.config)
            .storage(self.storage)
            .clock(Arc::new(TokioClock::starting_at(
                UNIX_EPOCH + Duration::from_secs(START),
            )))
            .navigator(navigator.clone());
        if self.frozen {
            builder = builder.timers(Arc::new(FrozenTimers::default()));
        }
        Harness {
            session: builder.build().expect("controller should build"),
            backend,
            navigator,
        }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder {
        config: SessionConfig::default(),
        storage: MemoryStorage::new(),
        frozen: false,
    }
}
