//! Session Store
//!
//! Single source of truth for who is logged in. State is held in memory and
//! mirrored write-through to durable storage under one fixed key.
//!
//! ```text
//! Anonymous --login(user)--------------> Authenticated(user)
//! Authenticated(_) --logout------------> Anonymous
//! Anonymous --restore, record present--> Authenticated(user)
//! Anonymous --restore, none/malformed--> Anonymous
//! ```

use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::error::{SessionError, SessionResult};
use super::storage::DurableStorage;
use super::types::{SessionState, User};

/// Default key the current user is stored under
pub const DEFAULT_STORAGE_KEY: &str = "user";

/// Holds the current authenticated user
///
/// Cheap to clone; clones share the same state. Pass it explicitly to every
/// component that needs it.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn DurableStorage>,
    key: String,
    state: watch::Sender<SessionState>,
    // Keeps the mirror write and the state change in one critical section
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Create a store in the Anonymous state; call `restore` to hydrate it
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    /// Create a store that mirrors under a custom key
    pub fn with_key(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self {
            inner: Arc::new(Inner {
                storage,
                key: key.into(),
                state,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Hydrate from durable storage
    ///
    /// Missing, unreadable, or malformed records leave the state Anonymous.
    /// Never fails.
    pub fn restore(&self) {
        let raw = match self.inner.storage.get(&self.inner.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!("No stored session");
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to read stored session: {}", e);
                return;
            }
        };

        let user = match serde_json::from_str::<User>(&raw) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Ignoring malformed stored session: {}", e);
                return;
            }
        };

        if let Err(reason) = user.validate() {
            tracing::warn!("Ignoring invalid stored session: {}", reason);
            return;
        }

        tracing::info!(user_id = %user.id, "Restored session");
        self.inner
            .state
            .send_replace(SessionState::Authenticated(user));
    }

    /// Make `user` the current user and persist it
    ///
    /// On error the state is left unchanged.
    pub fn login(&self, user: User) -> SessionResult<()> {
        user.validate().map_err(SessionError::InvalidUser)?;
        let serialized = serde_json::to_string(&user)?;

        let _guard = self.lock();
        self.inner.storage.set(&self.inner.key, &serialized)?;

        tracing::info!(user_id = %user.id, nrp = %user.nrp, "Logged in");
        self.inner
            .state
            .send_replace(SessionState::Authenticated(user));
        Ok(())
    }

    /// Clear the current user and its durable record; a no-op when Anonymous
    pub fn logout(&self) {
        let _guard = self.lock();

        if let Err(e) = self.inner.storage.remove(&self.inner.key) {
            tracing::warn!("Failed to remove stored session: {}", e);
        }

        self.inner.state.send_if_modified(|state| {
            match std::mem::take(state) {
                SessionState::Authenticated(user) => {
                    tracing::info!(user_id = %user.id, "Logged out");
                    true
                }
                SessionState::Anonymous => false,
            }
        });
    }

    /// The current user, if any
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Snapshot of the whole state
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Receive every subsequent state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Key the current user is mirrored under
    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        // Guards `()`; poisoning leaves nothing inconsistent
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.inner.key)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}
