//! One-shot timers and clocks for Dealgate.
//!
//! The session layer never calls `tokio::spawn` or `SystemTime::now`
//! directly. It goes through two small interfaces instead:
//!
//! - [`Timers`]: `after(delay, callback) -> TimerHandle`. Dropping or
//!   cancelling the handle guarantees the callback will not run.
//! - [`Clock`]: wall-clock `now()`, needed because token expirations are
//!   absolute Unix timestamps.
//!
//! # Testing
//!
//! [`TokioTimers`] sleeps on tokio's clock and [`TokioClock`] derives wall
//! time from it, so under `#[tokio::test(start_paused = true)]` the whole
//! session lifecycle runs against simulated time:
//!
//! ```ignore
//! let timers = TokioTimers::try_current()?;
//! let clock = TokioClock::starting_at(UNIX_EPOCH + Duration::from_secs(1_000));
//! tokio::time::advance(Duration::from_secs(180)).await;
//! assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(1_180));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use tokio::runtime::Handle;
use tokio::time::Instant as TokioInstant;
use tracing::trace;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from constructing timer infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// [`TokioTimers::try_current`] was called outside a tokio runtime.
    #[error("no tokio runtime is running on this thread")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

// ---------------------------------------------------------------------------
// Timer handles
// ---------------------------------------------------------------------------

/// Identifier of an armed timer, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    /// Creates a `TimerId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64`.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// The work a timer runs when it fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation token for an armed timer.
///
/// Cancels on drop: whoever owns the handle owns the timer. Replacing the
/// handle stored in a slot is therefore enough to disarm the old timer.
/// Cancelling a timer that already fired is a no-op.
#[must_use = "dropping a TimerHandle cancels the timer"]
pub struct TimerHandle {
    id: TimerId,
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    /// Wraps an implementation-specific cancel action.
    pub fn new(id: TimerId, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Cancels the timer. Same as dropping the handle, but reads better at
    /// call sites that mean it.
    pub fn cancel(mut self) {
        self.cancel_in_place();
    }

    fn cancel_in_place(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            trace!(timer = %self.id, "timer cancelled");
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel_in_place();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").field("id", &self.id).finish()
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// Schedules one-shot callbacks.
///
/// `Send + Sync + 'static` because a single instance is shared by every
/// component of a tab context, and callbacks re-arm timers from inside
/// other timers' callbacks.
pub trait Timers: Send + Sync + 'static {
    /// Runs `callback` once after `delay` unless the returned handle is
    /// cancelled or dropped first. A zero delay fires as soon as the
    /// runtime gets to it, never synchronously inside `after`.
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

/// [`Timers`] backed by tokio tasks and `tokio::time::sleep`.
///
/// Each timer is one task; cancelling aborts it. The callback runs on the
/// task itself, so it must not block. Callbacks that need to await spawn
/// their own task.
#[derive(Debug)]
pub struct TokioTimers {
    runtime: Handle,
    next_id: AtomicU64,
}

impl TokioTimers {
    /// Timers on the given runtime.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
        }
    }

    /// Timers on the runtime the caller is running in.
    ///
    /// # Errors
    /// [`TimerError::NoRuntime`] outside a tokio runtime.
    pub fn try_current() -> Result<Self, TimerError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Timers for TokioTimers {
    fn after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = TimerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        trace!(timer = %id, delay_ms = delay.as_millis() as u64, "timer armed");

        // Deadline is fixed now, not when the task is first polled.
        let deadline = TokioInstant::now() + delay;
        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            trace!(timer = %id, "timer fired");
            callback();
        });

        let abort = task.abort_handle();
        TimerHandle::new(id, move || abort.abort())
    }
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Source of wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> SystemTime;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Wall clock derived from tokio's monotonic clock.
///
/// Anchored at construction: `now()` is the anchor's wall time plus however
/// far tokio's clock has moved since. With a paused runtime that makes
/// `tokio::time::advance` move token expirations and timers in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall_origin: SystemTime,
    origin: TokioInstant,
}

impl TokioClock {
    /// Anchored at the current system time.
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Anchored at an arbitrary wall time. Tests use a fixed epoch offset so
    /// token expirations are easy to reason about.
    pub fn starting_at(wall_origin: SystemTime) -> Self {
        Self {
            wall_origin,
            origin: TokioInstant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> SystemTime {
        self.wall_origin + self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_id_display() {
        assert_eq!(TimerId::new(7).to_string(), "timer-7");
        assert_eq!(TimerId::new(7).into_inner(), 7);
    }

    #[test]
    fn test_timer_handle_cancel_runs_cancel_action_once() {
        use std::sync::Arc;
        use std::sync::atomic::AtomicUsize;

        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = TimerHandle::new(TimerId::new(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        handle.cancel();

        // `cancel` consumed the handle; the drop afterwards must not
        // run the action a second time.
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_current_outside_runtime_returns_error() {
        assert!(matches!(
            TokioTimers::try_current(),
            Err(TimerError::NoRuntime(_))
        ));
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now() > SystemTime::UNIX_EPOCH);
    }
}
