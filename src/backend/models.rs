//! Row types for the tables the console reads and writes
//!
//! - `custom_users`: registered voters with their credential
//! - `user_session`: login/logout timestamp pairs with an active flag
//! - `user_locations`: GPS fixes reported by the voting app

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::session::types::string_or_number;
use crate::session::User;

pub const USERS_TABLE: &str = "custom_users";
pub const SESSIONS_TABLE: &str = "user_session";
pub const LOCATIONS_TABLE: &str = "user_locations";

/// A registered user
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub nama: String,
    pub nrp: i64,
    #[serde(default)]
    pub password: String,
}

impl UserRow {
    /// The session view of this row, without the credential
    pub fn to_session_user(&self) -> User {
        User::new(self.id.clone(), self.nrp.to_string(), self.nama.clone())
    }
}

/// A login/logout record
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub login_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub logout_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: bool,
}

/// Body for inserting a fresh session
#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    pub user_id: String,
    pub username: String,
    pub login_time: DateTime<Utc>,
    pub is_active: bool,
}

/// A reported GPS position
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocationRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub user_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrap(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrap>::deserialize(deserializer)?.map(|w| w.0))
}

/// Accepts RFC 3339 (`timestamptz`) and zone-less (`timestamp`, read as UTC) values
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres renders `timestamptz` with a short offset like `+00`
    if let Ok(dt) = DateTime::parse_from_str(&format!("{}00", s), "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_user_row_to_session_user() {
        let row: UserRow = serde_json::from_value(json!({
            "id": 7,
            "nama": "Alice",
            "nrp": 1001,
            "password": "secret"
        }))
        .unwrap();

        let user = row.to_session_user();
        assert_eq!(user, User::new("7", "1001", "Alice"));
    }

    #[test]
    fn test_session_row_timestamps() {
        let row: SessionRow = serde_json::from_value(json!({
            "id": "s1",
            "user_id": "u1",
            "login_time": "2024-05-01T10:00:00.123456+00:00",
            "logout_time": null,
            "is_active": true
        }))
        .unwrap();

        assert_eq!(row.user_id.as_deref(), Some("u1"));
        assert!(row.username.is_none());
        assert!(row.logout_time.is_none());
        assert!(row.is_active);
        let login = row.login_time.unwrap();
        assert_eq!(login.timestamp(), Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T10:00:00+00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_location_row() {
        let row: LocationRow = serde_json::from_value(json!({
            "id": 3,
            "user_id": 9,
            "latitude": -7.25,
            "longitude": 112.75,
            "timestamp": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(row.id, "3");
        assert_eq!(row.user_id.as_deref(), Some("9"));
        assert!(row.timestamp.is_some());
    }

    #[test]
    fn test_new_session_serializes() {
        let body = serde_json::to_value(NewSession {
            user_id: "u1".to_string(),
            username: "1001".to_string(),
            login_time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            is_active: true,
        })
        .unwrap();
        assert_eq!(body["username"], "1001");
        assert_eq!(body["is_active"], true);
        assert_eq!(body["login_time"], "2024-05-01T10:00:00Z");
    }
}
