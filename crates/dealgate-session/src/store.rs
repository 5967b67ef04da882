//! The token store: the tab's single source of truth for "logged in".
//!
//! The session is persisted as four storage keys that are always written
//! and cleared together. Older code paths left copies of the same data
//! under other names, so clearing also sweeps those.
//!
//! # Generations
//!
//! Every [`write`](TokenStore::write) and [`clear`](TokenStore::clear)
//! bumps a counter. A refresh remembers the generation it started from
//! and only applies its result through
//! [`replace_tokens`](TokenStore::replace_tokens), which refuses if the
//! counter moved. A refresh that completes after logout therefore cannot
//! bring the session back.

use dealgate_token::{Role, Session};
use parking_lot::Mutex;

use crate::storage::{MemoryStorage, TabStorage};

/// Storage key names.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER_ID: &str = "userId";
    pub const USER_ROLE: &str = "userRole";

    /// The four keys that make up a session.
    pub const SESSION: [&str; 4] = [TOKEN, REFRESH_TOKEN, USER_ID, USER_ROLE];

    /// Alternate names written by older login flows. Never read, always
    /// cleared.
    pub const LEGACY: [&str; 6] = [
        "accessToken",
        "access_token",
        "refresh_token",
        "user_id",
        "role",
        "user",
    ];
}

/// Role-prefixed copy of a session key, e.g. `seller_refreshToken`.
pub fn role_key(role: Role, key: &str) -> String {
    format!("{role}_{key}")
}

struct StoreInner {
    storage: Box<dyn TabStorage>,
    generation: u64,
}

/// Reads and writes the session group in tab storage.
///
/// All group operations run under one lock, so a reader never sees half of
/// a write.
pub struct TokenStore {
    inner: Mutex<StoreInner>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    /// A store over fresh [`MemoryStorage`].
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::new())
    }

    /// A store over existing storage, e.g. one seeded by a previous page
    /// load in the same tab.
    pub fn with_storage(storage: impl TabStorage) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                storage: Box::new(storage),
                generation: 0,
            }),
        }
    }

    /// Persists `session`, replacing whatever was stored.
    ///
    /// A session without a refresh token removes any stale `refreshToken`
    /// left by a previous login.
    pub fn write(&self, session: &Session) {
        let mut inner = self.inner.lock();
        let storage = &mut inner.storage;
        storage.set(keys::TOKEN, session.access_token.clone());
        storage.set(keys::USER_ID, session.user_id.clone());
        storage.set(keys::USER_ROLE, session.role.as_str().to_string());
        match &session.refresh_token {
            Some(refresh) => storage.set(keys::REFRESH_TOKEN, refresh.clone()),
            None => storage.remove(keys::REFRESH_TOKEN),
        }
        inner.generation += 1;
    }

    /// The stored session, or `None` if the group is incomplete or the
    /// role does not parse.
    pub fn read(&self) -> Option<Session> {
        self.read_versioned().map(|(session, _)| session)
    }

    /// The stored session together with the generation it was read at.
    pub fn read_versioned(&self) -> Option<(Session, u64)> {
        let inner = self.inner.lock();
        let storage = &inner.storage;

        let access_token = storage.get(keys::TOKEN)?;
        let user_id = storage.get(keys::USER_ID)?;
        let raw_role = storage.get(keys::USER_ROLE)?;
        let role = match raw_role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => {
                tracing::debug!(error = %e, "stored role unreadable, treating session as absent");
                return None;
            }
        };

        let session = Session {
            access_token,
            refresh_token: storage.get(keys::REFRESH_TOKEN),
            user_id,
            role,
        };
        Some((session, inner.generation))
    }

    /// Swaps in refreshed tokens if nothing has written or cleared the
    /// store since `generation`.
    ///
    /// `refresh_token` of `None` keeps the existing refresh token. Returns
    /// `false` and changes nothing when the generation moved or the
    /// session is gone.
    pub fn replace_tokens(
        &self,
        generation: u64,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation || inner.storage.get(keys::TOKEN).is_none() {
            return false;
        }
        inner.storage.set(keys::TOKEN, access_token.to_string());
        if let Some(refresh) = refresh_token {
            inner.storage.set(keys::REFRESH_TOKEN, refresh.to_string());
        }
        inner.generation += 1;
        true
    }

    /// Removes the session group, the legacy keys and the role-prefixed
    /// copies for `role`. With `None`, prefixed copies for every role are
    /// removed.
    pub fn clear(&self, role: Option<Role>) {
        let mut inner = self.inner.lock();
        let storage = &mut inner.storage;

        for key in keys::SESSION.iter().chain(keys::LEGACY.iter()) {
            storage.remove(key);
        }

        let roles: &[Role] = match &role {
            Some(role) => std::slice::from_ref(role),
            None => &Role::ALL,
        };
        for role in roles {
            for key in keys::SESSION {
                storage.remove(&role_key(*role, key));
            }
        }

        inner.generation += 1;
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Every key present in the underlying storage. For diagnostics and
    /// tests.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().storage.keys()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TokenStore")
            .field("keys", &inner.storage.keys().len())
            .field("generation", &inner.generation)
            .finish()
    }
}
