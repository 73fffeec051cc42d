//! Login Screen
//!
//! Checks the NRP/password pair against `custom_users`, records the login in
//! `user_session`, then hands the user to the session store.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::{
    BackendError, Filter, NewSession, QueryService, SelectQuery, SessionRow, UserRow,
    SESSIONS_TABLE, USERS_TABLE,
};
use crate::session::{SessionError, SessionStore, User};

/// Longest NRP the form accepts
pub const MAX_NRP_LEN: usize = 8;

/// Form input
#[derive(Debug, Clone)]
pub struct Credentials {
    pub nrp: String,
    pub password: String,
}

impl Credentials {
    pub fn new(nrp: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            nrp: nrp.into(),
            password: password.into(),
        }
    }

    fn validate(&self) -> Result<(), LoginError> {
        let nrp = self.nrp.trim();
        if nrp.is_empty() {
            return Err(LoginError::Validation("NRP is required".to_string()));
        }
        if nrp.chars().count() > MAX_NRP_LEN {
            return Err(LoginError::Validation(format!(
                "NRP must be at most {} characters",
                MAX_NRP_LEN
            )));
        }
        if !nrp.chars().all(|c| c.is_ascii_digit()) {
            return Err(LoginError::Validation("NRP must be numeric".to_string()));
        }
        if self.password.is_empty() {
            return Err(LoginError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

/// Login failures
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid NRP or password")]
    InvalidCredentials,

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl LoginError {
    /// The inline line shown under the form
    pub fn user_message(&self) -> String {
        match self {
            LoginError::Validation(_) | LoginError::InvalidCredentials => self.to_string(),
            LoginError::Backend(_) | LoginError::Session(_) => {
                "Something went wrong while logging in".to_string()
            }
        }
    }
}

/// Login/logout actions
pub struct LoginScreen {
    backend: Arc<dyn QueryService>,
    session: SessionStore,
}

impl LoginScreen {
    pub fn new(backend: Arc<dyn QueryService>, session: SessionStore) -> Self {
        Self { backend, session }
    }

    /// Verify, record the session row, and log in
    pub async fn submit(&self, credentials: &Credentials) -> Result<User, LoginError> {
        credentials.validate()?;
        let nrp = credentials.nrp.trim();

        let row = self.find_user(nrp).await?;
        let row = match row {
            Some(row) if row.password == credentials.password => row,
            _ => {
                tracing::warn!(nrp = %nrp, "Login rejected");
                return Err(LoginError::InvalidCredentials);
            }
        };

        self.record_login(&row).await?;

        let user = row.to_session_user();
        self.session.login(user.clone())?;
        tracing::info!(nrp = %nrp, "Login succeeded, session stored");
        Ok(user)
    }

    /// Close the active session row, then clear the local session
    ///
    /// A backend failure is logged and does not keep the user logged in.
    pub async fn logout(&self) {
        if let Some(user) = self.session.current_user() {
            let patch = json!({
                "is_active": false,
                "logout_time": Utc::now(),
            });
            let filters = [
                Filter::eq("username", &user.nrp),
                Filter::eq("is_active", true),
            ];
            if let Err(e) = self.backend.update(SESSIONS_TABLE, &filters, patch).await {
                tracing::error!(nrp = %user.nrp, "Failed to close session row: {}", e);
            }
        }
        self.session.logout();
    }

    async fn find_user(&self, nrp: &str) -> Result<Option<UserRow>, LoginError> {
        let query = SelectQuery::table(USERS_TABLE).eq("nrp", nrp).limit(1);
        match self.backend.select(&query).await {
            Ok(response) => Ok(response.first()?),
            Err(BackendError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert-or-update the active session row keyed by username
    ///
    /// Not atomic: two devices logging in as the same user at once can both
    /// miss the active row and insert two.
    async fn record_login(&self, row: &UserRow) -> Result<(), LoginError> {
        let username = row.nrp.to_string();
        let now = Utc::now();

        let query = SelectQuery::table(SESSIONS_TABLE)
            .eq("username", &username)
            .eq("is_active", true)
            .order("login_time", false)
            .limit(1);
        let existing: Option<SessionRow> = match self.backend.select(&query).await {
            Ok(response) => response.first()?,
            Err(BackendError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        match existing {
            Some(session) => {
                tracing::debug!(session_id = %session.id, "Refreshing active session");
                self.backend
                    .update(
                        SESSIONS_TABLE,
                        &[Filter::eq("id", &session.id)],
                        json!({ "login_time": now }),
                    )
                    .await?;
            }
            None => {
                let new_session = NewSession {
                    user_id: row.id.clone(),
                    username,
                    login_time: now,
                    is_active: true,
                };
                self.backend
                    .insert(SESSIONS_TABLE, serde_json::to_value(new_session).map_err(BackendError::from)?)
                    .await?;
            }
        }
        Ok(())
    }
}
