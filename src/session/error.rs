//! Session error types
//!
//! Errors raised by durable storage and the session store.

use thiserror::Error;

/// Errors from a durable storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage file exists but is not a key/value document
    #[error("Corrupt storage: {0}")]
    Corrupt(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by the session store
#[derive(Error, Debug)]
pub enum SessionError {
    /// The user record is missing a required field
    #[error("Invalid user: {0}")]
    InvalidUser(String),

    /// The record could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The durable mirror could not be written
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;
