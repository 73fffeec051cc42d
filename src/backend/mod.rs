//! Tables API Access
//!
//! The hosted backend is consumed as a black box through `QueryService`:
//!
//! - **query**: Select builder and response wrapper
//! - **client**: PostgREST client over reqwest
//! - **models**: Rows of `custom_users`, `user_session`, `user_locations`
//! - **error**: Error types
//!
//! Nothing here retries. Callers log failures and degrade their view.

pub mod client;
pub mod error;
pub mod models;
pub mod query;

#[cfg(test)]
pub mod memory;

pub use client::{ClientConfig, PostgrestClient};
pub use error::{BackendError, BackendResult, NO_ROWS_CODE};
pub use models::{
    LocationRow, NewSession, SessionRow, UserRow, LOCATIONS_TABLE, SESSIONS_TABLE, USERS_TABLE,
};
pub use query::{Filter, Order, QueryResponse, SelectQuery};

use async_trait::async_trait;
use serde_json::Value;

/// Generic table access: filtered/ordered/paged reads plus inserts and updates
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Read rows
    async fn select(&self, query: &SelectQuery) -> BackendResult<QueryResponse>;

    /// Insert one row
    async fn insert(&self, table: &str, row: Value) -> BackendResult<()>;

    /// Apply `patch` to every row matching all `filters`
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> BackendResult<()>;
}
