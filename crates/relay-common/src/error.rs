//! Error types for relay operations.

use thiserror::Error;

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Reasons a relay request is refused.
///
/// A refused request never changes state and never produces a broadcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RelayError {
    #[error("A chat needs at least 2 distinct participants, got {0}")]
    TooFewParticipants(usize),

    #[error("Invalid participant id: {0:?}")]
    InvalidParticipant(String),

    #[error("Message has no sender")]
    MissingSender,

    #[error("Message text is blank")]
    BlankMessage,

    #[error("Unknown chat: {0}")]
    UnknownChat(String),

    #[error("Chat id {given} does not match participants (expected {expected})")]
    ChatIdMismatch { given: String, expected: String },

    #[error("{user} is not a participant of {chat}")]
    NotAParticipant { user: String, chat: String },
}
