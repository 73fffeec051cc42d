//! Session data types
//!
//! - `User`: the record that identifies who is logged in
//! - `SessionState`: Anonymous or Authenticated

use serde::{Deserialize, Deserializer, Serialize};

/// The authenticated user as mirrored to durable storage
///
/// Carries no credential; the backend row is `backend::UserRow`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend row identifier
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Registration number, numeric on the backend
    #[serde(deserialize_with = "string_or_number")]
    pub nrp: String,
    /// Display name
    pub nama: String,
}

impl User {
    /// Create a new user record
    pub fn new(id: impl Into<String>, nrp: impl Into<String>, nama: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nrp: nrp.into(),
            nama: nama.into(),
        }
    }

    /// Check the fields a session cannot work without
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".to_string());
        }
        if self.nama.trim().is_empty() {
            return Err("nama must not be empty".to_string());
        }
        Ok(())
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

/// Who is logged in, if anyone
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}
