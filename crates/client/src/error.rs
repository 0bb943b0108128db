//! Error types for client operations.

use relay_common::RelayError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Relay answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("No chat selected")]
    NoChatSelected,

    #[error("Subscription closed")]
    Closed,
}

impl ClientError {
    /// Whether the relay could not be reached at all, as opposed to refusing.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Http(_) | ClientError::Closed)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}
