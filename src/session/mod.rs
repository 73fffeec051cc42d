//! Session Management
//!
//! - **types**: `User` and `SessionState`
//! - **storage**: Durable key/value storage (file and in-memory)
//! - **store**: The session store itself
//! - **error**: Error types
//!
//! # Lifecycle
//!
//! ```text
//! start → restore() → [Anonymous | Authenticated] ⇄ login()/logout()
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voting_admin::session::{FileStorage, SessionStore, User};
//!
//! let store = SessionStore::new(Arc::new(FileStorage::new("./data")));
//! store.restore();
//!
//! store.login(User::new("1", "1001", "Alice")).unwrap();
//! assert_eq!(store.current_user().map(|u| u.nama), Some("Alice".to_string()));
//!
//! store.logout();
//! ```

pub mod error;
pub mod storage;
pub mod store;
pub mod types;

pub use error::{SessionError, SessionResult, StorageError, StorageResult};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use store::{SessionStore, DEFAULT_STORAGE_KEY};
pub use types::{SessionState, User};
