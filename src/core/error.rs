//! Error taxonomy surfaced at the service boundary.
//!
//! Internals use `anyhow`; these variants are what a caller sees, each with a
//! fixed HTTP-style status code.

use serde::Serialize;

/// Failure of a reminder request or route lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReminderError {
    /// Missing or invalid request field.
    #[error("{0}")]
    Validation(String),

    /// Request body is not valid JSON for the expected shape.
    #[error("{0}")]
    Decode(String),

    /// No such route.
    #[error("{0}")]
    NotFound(String),

    /// Persistence backend failure while handling a request.
    #[error("Server error: {0}")]
    Store(String),

    /// Anything else unexpected (e.g. a blocking task that died).
    #[error("Server error: {0}")]
    Internal(String),
}

impl ReminderError {
    pub fn status_code(&self) -> u16 {
        match self {
            ReminderError::Validation(_) | ReminderError::Decode(_) => 400,
            ReminderError::NotFound(_) => 404,
            ReminderError::Store(_) | ReminderError::Internal(_) => 500,
        }
    }

    /// JSON payload for this error
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            status_code: self.status_code(),
        }
    }
}

/// `{error, status_code}` body returned for every failed request
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub status_code: u16,
}
