//! Shared pieces of the chat relay
//!
//! Both the relay server and the client mirror depend on this crate so that
//! chat identity is derived by exactly one function on either side of the wire.

pub mod error;
pub mod identity;
pub mod models;
pub mod protocol;

pub use error::{RelayError, Result};
pub use identity::{chat_id, decompose_chat_id, normalize_participants, validate_participants, CHAT_ID_SEPARATOR};
pub use models::{generate_id, now_millis, Chat, Message, MessageType, Snapshot, User};
pub use protocol::{ClientEvent, EnsureChatRequest, SendMessageRequest, ServerEvent};
