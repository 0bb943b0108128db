//! Relay event protocol
//!
//! Every frame is a JSON object tagged by `"event"`. The same frames travel
//! over the WebSocket channel and, newline-delimited, over the streaming
//! `/subscribe` response.

use serde::{Deserialize, Serialize};

use crate::models::{Chat, Snapshot};

/// Payload of an `ensureChat` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureChatRequest {
    #[serde(default)]
    pub participant_ids: Vec<String>,
    /// Correlation id echoed back in the `ack` frame (WebSocket only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
}

impl EnsureChatRequest {
    pub fn new<S: AsRef<str>>(participant_ids: &[S]) -> Self {
        Self {
            participant_ids: participant_ids.iter().map(|s| s.as_ref().to_string()).collect(),
            ack: None,
        }
    }
}

/// Payload of a `sendMessage` request.
///
/// Missing fields decode as empty so the relay can refuse them explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub from_id: String,
    #[serde(default)]
    pub text: String,
    /// Explicit participant set for create-or-fetch when the chat may not exist yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_ids: Option<Vec<String>>,
}

/// Frames sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientEvent {
    Bootstrap,
    EnsureChat(EnsureChatRequest),
    SendMessage(SendMessageRequest),
}

/// Frames pushed by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full snapshot, answer to `bootstrap`
    State(Snapshot),
    /// Broadcast of a created or mutated chat
    ChatUpdated { chat: Chat },
    /// Direct answer to an `ensureChat` carrying an ack id
    Ack { ack: u64, chat: Chat },
    /// Refused request, sent to the caller only
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ack: Option<u64>,
    },
}

impl ServerEvent {
    /// Encode as a single JSON frame without trailing newline.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_frame(frame: &str) -> serde_json::Result<Self> {
        serde_json::from_str(frame)
    }
}
