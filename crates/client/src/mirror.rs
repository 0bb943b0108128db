//! Local mirror of the relay state
//!
//! Server pushes always win at whole-chat granularity. Optimistic messages
//! survive a replacement until an authoritative echo is seen: a new message
//! from the same sender with the same content whose timestamp lies within the
//! echo window. Each authoritative message retires at most one optimistic one,
//! and messages already present before the push never count as echoes. Once
//! the window has passed without an echo the optimistic copy is dropped.

use relay_common::{
    chat_id, now_millis, validate_participants, Chat, Message, RelayError, Snapshot, User,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct PendingMessage {
    chat_id: String,
    message: Message,
}

#[derive(Debug)]
pub struct ChatMirror {
    current_user: String,
    users: Vec<User>,
    chats: Vec<Chat>,
    selected_chat: Option<String>,
    pending: Vec<PendingMessage>,
    echo_window_ms: i64,
    auto_selected: bool,
}

impl ChatMirror {
    /// Empty mirror waiting for a bootstrap.
    pub fn new(current_user: impl Into<String>, echo_window_ms: i64) -> Self {
        Self {
            current_user: current_user.into(),
            users: Vec::new(),
            chats: Vec::new(),
            selected_chat: None,
            pending: Vec::new(),
            echo_window_ms,
            auto_selected: false,
        }
    }

    /// Mirror seeded with the default roster and a chat between the first two
    /// users, usable before (or without) any relay connection.
    pub fn standalone(current_user: impl Into<String>, echo_window_ms: i64) -> Self {
        let mut mirror = Self::new(current_user, echo_window_ms);
        mirror.users = User::default_roster();
        let seed = Chat::new(&[mirror.users[0].id.as_str(), mirror.users[1].id.as_str()]);
        mirror.selected_chat = Some(seed.id.clone());
        mirror.chats.push(seed);
        mirror
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    /// Switch the user messages are sent as. Unknown ids are refused.
    pub fn set_current_user(&mut self, user_id: &str) -> bool {
        if self.user(user_id).is_none() {
            return false;
        }
        self.current_user = user_id.to_string();
        true
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn selected_chat(&self) -> Option<&Chat> {
        self.selected_chat.as_deref().and_then(|id| self.chat(id))
    }

    pub fn select_chat(&mut self, id: &str) -> bool {
        if self.chat(id).is_none() {
            return false;
        }
        self.selected_chat = Some(id.to_string());
        true
    }

    pub fn echo_window_ms(&self) -> i64 {
        self.echo_window_ms
    }

    /// Optimistic messages not yet confirmed by the relay.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Replace users and chats wholesale with a bootstrap snapshot.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        info!(
            "Applying snapshot: {} users, {} chats",
            snapshot.users.len(),
            snapshot.chats.len()
        );
        let mut chats = snapshot.chats;
        for chat in &mut chats {
            self.reconcile_pending(chat);
        }
        self.users = snapshot.users;
        self.chats = chats;

        // A selection the relay does not know about counts as none
        let selection_known = self.selected_chat().is_some();
        if !selection_known {
            self.selected_chat = self.chats.first().map(|c| c.id.clone());
        }
    }

    /// Merge one authoritative chat: replace by id, or append when new.
    pub fn apply_chat_updated(&mut self, mut chat: Chat) {
        self.reconcile_pending(&mut chat);
        match self.chats.iter_mut().find(|c| c.id == chat.id) {
            Some(existing) => {
                debug!("Replacing chat {} ({} messages)", chat.id, chat.messages.len());
                *existing = chat;
            }
            None => {
                debug!("Adding chat {}", chat.id);
                self.chats.push(chat);
            }
        }
    }

    /// Create-or-fetch a chat locally with the relay's identity rules.
    pub fn ensure_chat_local<S: AsRef<str>>(&mut self, participant_ids: &[S]) -> Result<Chat, RelayError> {
        let participants = validate_participants(participant_ids)?;
        let id = chat_id(&participants);
        if let Some(existing) = self.chat(&id) {
            return Ok(existing.clone());
        }
        let chat = Chat::new(&participants);
        self.chats.push(chat.clone());
        Ok(chat)
    }

    /// Append a locally generated message before the relay has seen it and
    /// hold it as pending until its echo arrives.
    pub fn optimistic_send(&mut self, chat_id: &str, text: &str) -> Result<Message, RelayError> {
        let message = self.append_local(chat_id, text)?;
        self.pending.push(PendingMessage {
            chat_id: chat_id.to_string(),
            message: message.clone(),
        });
        Ok(message)
    }

    /// Append a message that no relay will echo back.
    pub fn append_local(&mut self, chat_id: &str, text: &str) -> Result<Message, RelayError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(RelayError::BlankMessage);
        }
        let sender = self.current_user.clone();
        let chat = self
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| RelayError::UnknownChat(chat_id.to_string()))?;
        if !chat.has_participant(&sender) {
            return Err(RelayError::NotAParticipant {
                user: sender,
                chat: chat_id.to_string(),
            });
        }

        let message = Message::text(sender, content);
        chat.push_message(message.clone());
        Ok(message)
    }

    /// Stop waiting for the echo of `message_id`. The local copy stays until
    /// the next authoritative push for its chat replaces it.
    pub fn discard_pending(&mut self, message_id: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.message.id != message_id);
        self.pending.len() != before
    }

    /// Participants for the initial chat, once, when nothing is selected yet
    /// and the roster has someone besides the current user.
    pub fn auto_select_target(&mut self) -> Option<Vec<String>> {
        if self.auto_selected || self.selected_chat.is_some() {
            return None;
        }
        let other = self.users.iter().find(|u| u.id != self.current_user)?;
        let target = vec![self.current_user.clone(), other.id.clone()];
        self.auto_selected = true;
        Some(target)
    }

    /// Retire pending messages echoed in `chat`, re-append the others.
    fn reconcile_pending(&mut self, chat: &mut Chat) {
        if self.pending.is_empty() {
            return;
        }

        let known: HashSet<&str> = self
            .chats
            .iter()
            .find(|c| c.id == chat.id)
            .map(|c| c.messages.iter().map(|m| m.id.as_str()).collect())
            .unwrap_or_default();
        let mut claimed: Vec<bool> = chat
            .messages
            .iter()
            .map(|m| known.contains(m.id.as_str()))
            .collect();

        let window = self.echo_window_ms;
        let now = now_millis();
        let mut unconfirmed = Vec::new();
        let mut retired = 0;
        let mut expired = 0;
        for pending in std::mem::take(&mut self.pending) {
            if pending.chat_id != chat.id {
                unconfirmed.push(pending);
                continue;
            }
            let echo = chat.messages.iter().enumerate().position(|(i, m)| {
                !claimed[i]
                    && m.sender_id == pending.message.sender_id
                    && m.content == pending.message.content
                    && (m.timestamp - pending.message.timestamp).abs() <= window
            });
            match echo {
                Some(i) => {
                    claimed[i] = true;
                    retired += 1;
                }
                // Any echo would now fall outside the window
                None if now - pending.message.timestamp > window => expired += 1,
                None => {
                    chat.messages.push(pending.message.clone());
                    unconfirmed.push(pending);
                }
            }
        }
        if retired > 0 {
            debug!("Chat {}: {} optimistic messages confirmed", chat.id, retired);
        }
        if expired > 0 {
            warn!("Chat {}: dropped {} unconfirmed messages", chat.id, expired);
        }
        self.pending = unconfirmed;
    }
}
