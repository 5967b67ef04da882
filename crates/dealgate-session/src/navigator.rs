//! Where logged-out tabs go.
//!
//! The session layer never renders anything. When a session ends with a
//! redirect it hands the login path to a [`Navigator`] and lets the host
//! do the routing.

use parking_lot::Mutex;

/// Sends the tab to a path.
///
/// Closures implement this, so a host can pass
/// `|path: &str| router.push(path)` directly.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, destination: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn navigate(&self, destination: &str) {
        self(destination)
    }
}

/// Default navigator: logs the destination and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, destination: &str) {
        tracing::info!(destination, "redirecting to login");
    }
}

/// Remembers every destination. Handy in tests and demos.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    destinations: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every destination so far, oldest first.
    pub fn destinations(&self) -> Vec<String> {
        self.destinations.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.destinations.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: &str) {
        self.destinations.lock().push(destination.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_closure_navigator_receives_destination() {
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let navigator = move |path: &str| *sink.lock() = path.to_string();

        navigator.navigate("/seller/login");

        assert_eq!(*seen.lock(), "/seller/login");
    }

    #[test]
    fn test_recording_navigator_keeps_order() {
        let navigator = RecordingNavigator::new();
        navigator.navigate("/login");
        navigator.navigate("/buyer/login");

        assert_eq!(navigator.destinations(), vec!["/login", "/buyer/login"]);
        assert_eq!(navigator.last().as_deref(), Some("/buyer/login"));
    }
}
