use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{chat_id, normalize_participants};

/// Generate a fresh unique id for messages and locally minted users.
///
/// The simple (hyphen-free) UUID form keeps ids safe inside chat keys.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// A user whose id is generated locally, for clients running without a server.
    pub fn with_generated_id(name: impl Into<String>) -> Self {
        Self::new(generate_id(), name)
    }

    /// The fixed roster seeded at process start.
    pub fn default_roster() -> Vec<User> {
        vec![
            User::new("u1", "User 1"),
            User::new("u2", "User 2"),
            User::new("u3", "User 3"),
        ]
    }
}

/// A conversation keyed by its participant set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub participant_ids: Vec<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Chat {
    /// Create an empty chat. The id is always derived from the participants.
    pub fn new<S: AsRef<str>>(participant_ids: &[S]) -> Self {
        Self {
            id: chat_id(participant_ids),
            participant_ids: normalize_participants(participant_ids),
            messages: Vec::new(),
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|id| id == user_id)
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Participant names joined for display, falling back to the raw id.
    pub fn title(&self, users: &[User]) -> String {
        self.participant_ids
            .iter()
            .map(|id| {
                users
                    .iter()
                    .find(|u| &u.id == id)
                    .map(|u| u.name.as_str())
                    .unwrap_or(id.as_str())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn preview(&self) -> &str {
        self.last_message()
            .map(|m| m.content.as_str())
            .unwrap_or("Start chatting")
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl Message {
    /// A text message stamped with a fresh id and the current time.
    pub fn text(sender_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            sender_id: sender_id.into(),
            content: content.into(),
            message_type: MessageType::Text,
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
}

/// Full state handed to a client on bootstrap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub chats: Vec<Chat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_json_uses_camel_case() {
        let mut chat = Chat::new(&["u2", "u1"]);
        chat.push_message(Message {
            id: "m1".into(),
            sender_id: "u1".into(),
            content: "hi".into(),
            message_type: MessageType::Text,
            timestamp: 1_700_000_000_000,
        });

        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(json["id"], "u1-u2");
        assert_eq!(json["participantIds"], serde_json::json!(["u2", "u1"]));
        assert_eq!(json["messages"][0]["senderId"], "u1");
        assert_eq!(json["messages"][0]["type"], "text");
        assert_eq!(json["messages"][0]["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_chat_keeps_insertion_order_but_sorted_id() {
        let chat = Chat::new(&["u3", "u1", "u3"]);
        assert_eq!(chat.id, "u1-u3");
        assert_eq!(chat.participant_ids, vec!["u3", "u1"]);
        assert!(chat.messages.is_empty());
    }

    #[test]
    fn test_title_and_preview() {
        let users = User::default_roster();
        let mut chat = Chat::new(&["u1", "ghost"]);
        assert_eq!(chat.title(&users), "User 1, ghost");
        assert_eq!(chat.preview(), "Start chatting");

        chat.push_message(Message::text("u1", "hello"));
        assert_eq!(chat.preview(), "hello");
    }

    #[test]
    fn test_generated_ids_are_unique_and_separator_free() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(!a.contains(crate::CHAT_ID_SEPARATOR));
    }
}
