//! Tables API error types

use serde::Deserialize;
use thiserror::Error;

/// PostgREST code for "zero (or more than one) rows where exactly one was asked for"
pub const NO_ROWS_CODE: &str = "PGRST116";

/// Errors that can occur when talking to the tables API
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Row not found")]
    NotFound,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// Build an error from a non-success response body
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) if parsed.code.as_deref() == Some(NO_ROWS_CODE) => BackendError::NotFound,
            Ok(parsed) => BackendError::Api {
                status,
                code: parsed.code.unwrap_or_default(),
                message: parsed
                    .message
                    .or(parsed.details)
                    .unwrap_or_else(|| body.to_string()),
            },
            Err(_) => BackendError::Api {
                status,
                code: String::new(),
                message: body.to_string(),
            },
        }
    }

    /// Classify a transport error the way callers care about
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Unavailable
        } else {
            BackendError::Request(e)
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Result type for tables API operations
pub type BackendResult<T> = Result<T, BackendError>;
