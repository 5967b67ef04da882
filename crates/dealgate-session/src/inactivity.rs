//! Sliding inactivity window.
//!
//! While armed, every observed activity signal pushes the deadline back by
//! the full window. If the window elapses with no signal, the session ends
//! with [`LogoutReason::Inactivity`], exactly once.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dealgate_timer::{TimerHandle, Timers};
use parking_lot::Mutex;

use crate::config::ActivitySignal;
use crate::session::{LogoutHook, LogoutReason};

struct Watch {
    listening: bool,
    epoch: u64,
    timer: Option<TimerHandle>,
}

pub(crate) struct InactivityMonitor {
    timers: Arc<dyn Timers>,
    window: Duration,
    signals: Vec<ActivitySignal>,
    watch: Mutex<Watch>,
    on_timeout: LogoutHook,
    this: Weak<Self>,
}

impl InactivityMonitor {
    pub(crate) fn new(
        timers: Arc<dyn Timers>,
        window: Duration,
        signals: Vec<ActivitySignal>,
        on_timeout: LogoutHook,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            timers,
            window,
            signals,
            watch: Mutex::new(Watch {
                listening: false,
                epoch: 0,
                timer: None,
            }),
            on_timeout,
            this: this.clone(),
        })
    }

    /// Starts listening and starts a fresh window.
    pub(crate) fn arm(&self) {
        self.watch.lock().listening = true;
        tracing::debug!(window_secs = self.window.as_secs(), "inactivity monitor armed");
        self.restart();
    }

    /// Stops listening and cancels the pending window.
    pub(crate) fn disarm(&self) {
        let cancelled = {
            let mut watch = self.watch.lock();
            watch.listening = false;
            watch.epoch += 1;
            watch.timer.take()
        };
        drop(cancelled);
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.watch.lock().listening
    }

    /// Restarts the window if armed. Returns whether it did.
    pub(crate) fn touch(&self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.restart();
        true
    }

    /// Feeds one interaction. Signals outside the configured set are
    /// ignored.
    pub(crate) fn observe(&self, signal: ActivitySignal) -> bool {
        self.signals.contains(&signal) && self.touch()
    }

    fn restart(&self) {
        let epoch = {
            let mut watch = self.watch.lock();
            if !watch.listening {
                return;
            }
            watch.epoch += 1;
            watch.epoch
        };

        let this = self.this.clone();
        let handle = self.timers.after(
            self.window,
            Box::new(move || {
                if let Some(monitor) = this.upgrade() {
                    monitor.expire(epoch);
                }
            }),
        );

        let replaced = {
            let mut watch = self.watch.lock();
            if watch.epoch != epoch || !watch.listening {
                return;
            }
            watch.timer.replace(handle)
        };
        drop(replaced);
    }

    fn expire(&self, epoch: u64) {
        let fired = {
            let mut watch = self.watch.lock();
            if watch.epoch != epoch || !watch.listening {
                return;
            }
            watch.listening = false;
            watch.timer.take()
        };
        drop(fired);

        tracing::info!(window_secs = self.window.as_secs(), "no activity within window, ending session");
        (self.on_timeout)(LogoutReason::Inactivity);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dealgate_timer::TokioTimers;

    use super::*;

    fn monitor(signals: Vec<ActivitySignal>) -> (Arc<InactivityMonitor>, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let monitor = InactivityMonitor::new(
            Arc::new(TokioTimers::try_current().unwrap()),
            Duration::from_secs(60),
            signals,
            Arc::new(move |reason: LogoutReason| {
                assert_eq!(reason, LogoutReason::Inactivity);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (monitor, fired)
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_after_full_window_fires_once() {
        let (monitor, fired) = monitor(ActivitySignal::ALL.to_vec());
        monitor.arm();

        tokio::time::advance(Duration::from_secs(59)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!monitor.is_armed());

        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_configured_signal_resets_window() {
        let (monitor, fired) = monitor(vec![ActivitySignal::KeyDown]);
        monitor.arm();

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(monitor.observe(ActivitySignal::KeyDown));
        tokio::time::advance(Duration::from_secs(45)).await;
        settle().await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(monitor.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_unconfigured_signal_is_ignored() {
        let (monitor, fired) = monitor(vec![ActivitySignal::KeyDown]);
        monitor.arm();

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(!monitor.observe(ActivitySignal::PointerMove));
        tokio::time::advance(Duration::from_secs(15)).await;
        settle().await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_pending_window() {
        let (monitor, fired) = monitor(ActivitySignal::ALL.to_vec());
        monitor.arm();
        monitor.disarm();

        assert!(!monitor.touch());
        tokio::time::advance(Duration::from_secs(120)).await;
        settle().await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
