//! Tab-scoped key/value storage.
//!
//! A browser tab keeps its session in per-tab storage that disappears with
//! the tab. [`TabStorage`] is that storage as a trait; [`MemoryStorage`]
//! is the in-process implementation every tab context uses by default.
//! The [`TokenStore`](crate::TokenStore) is the only component that talks
//! to storage directly.

use std::collections::HashMap;

/// String key/value storage owned by exactly one tab context.
///
/// Methods take `&mut self` for writes; the token store serializes access
/// behind its own lock, so implementations need no interior locking.
pub trait TabStorage: Send + 'static {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);

    /// Removing a missing key is a no-op.
    fn remove(&mut self, key: &str);

    /// Every key currently present, in no particular order.
    fn keys(&self) -> Vec<String>;
}

/// In-memory [`TabStorage`]. Lives as long as its tab context.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryStorage {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TabStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
