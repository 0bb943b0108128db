//! In-memory chat store with broadcast
//!
//! All reads and writes go through one lock, so mutations are applied one at a
//! time and broadcasts leave in the order the mutations happened.

use parking_lot::RwLock;
use relay_common::{
    chat_id, decompose_chat_id, validate_participants, Chat, Message, RelayError, Result,
    SendMessageRequest, ServerEvent, Snapshot, User,
};
use std::collections::HashMap;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Broadcast channel for real-time updates
#[derive(Clone)]
pub struct UpdateChannel {
    pub tx: broadcast::Sender<ServerEvent>,
}

impl UpdateChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }
}

#[derive(Default)]
struct StoreState {
    users: Vec<User>,
    /// Chats in creation order
    chats: Vec<Chat>,
    /// Chat id -> position in `chats`
    index: HashMap<String, usize>,
}

impl StoreState {
    fn has_user(&self, id: &str) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    /// Position of the chat for an already validated participant list,
    /// creating it when absent. The flag reports whether it was created.
    fn get_or_insert(&mut self, participants: &[String]) -> (usize, bool) {
        let id = chat_id(participants);
        if let Some(&pos) = self.index.get(&id) {
            return (pos, false);
        }
        let pos = self.chats.len();
        self.chats.push(Chat::new(participants));
        self.index.insert(id, pos);
        (pos, true)
    }

    fn resolve_for_send(&mut self, request: &SendMessageRequest) -> Result<usize> {
        // Explicit participants must agree with the id whether or not it exists
        if let Some(ids) = &request.participant_ids {
            let participants = validate_participants(ids)?;
            let expected = chat_id(&participants);
            if !request.chat_id.is_empty() && expected != request.chat_id {
                return Err(RelayError::ChatIdMismatch {
                    given: request.chat_id.clone(),
                    expected,
                });
            }
            return Ok(self.get_or_insert(&participants).0);
        }

        if let Some(&pos) = self.index.get(&request.chat_id) {
            return Ok(pos);
        }

        // A canonical key naming registered users stands for its participant set
        match decompose_chat_id(&request.chat_id) {
            Some(participants) if participants.iter().all(|p| self.has_user(p)) => {
                Ok(self.get_or_insert(&participants).0)
            }
            _ => Err(RelayError::UnknownChat(request.chat_id.clone())),
        }
    }
}

/// Authoritative owner of users and chats
pub struct ChatStore {
    state: RwLock<StoreState>,
    channel: UpdateChannel,
}

impl ChatStore {
    pub fn new(users: Vec<User>, broadcast_capacity: usize) -> Self {
        Self {
            state: RwLock::new(StoreState {
                users,
                ..StoreState::default()
            }),
            channel: UpdateChannel::new(broadcast_capacity),
        }
    }

    pub fn with_default_roster(broadcast_capacity: usize) -> Self {
        Self::new(User::default_roster(), broadcast_capacity)
    }

    pub fn users(&self) -> Vec<User> {
        self.state.read().users.clone()
    }

    pub fn chat(&self, id: &str) -> Option<Chat> {
        let state = self.state.read();
        state.index.get(id).map(|&pos| state.chats[pos].clone())
    }

    pub fn chat_count(&self) -> usize {
        self.state.read().chats.len()
    }

    /// Full snapshot of users and chats with their complete history.
    pub fn bootstrap(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            users: state.users.clone(),
            chats: state.chats.clone(),
        }
    }

    /// Receiver for every `chatUpdated` broadcast from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.channel.tx.subscribe()
    }

    /// Next event for a subscriber, or `None` once the channel is closed.
    ///
    /// A receiver that fell behind gets a fresh `state` in place of the
    /// broadcasts it missed.
    pub async fn recv_update(&self, rx: &mut broadcast::Receiver<ServerEvent>) -> Option<ServerEvent> {
        match rx.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Subscriber lagged by {} events, resending state", skipped);
                Some(ServerEvent::State(self.bootstrap()))
            }
            Err(RecvError::Closed) => None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.channel.tx.receiver_count()
    }

    /// Create-or-fetch the chat for a participant set.
    ///
    /// The resulting chat is broadcast on every successful call, whether it
    /// was just created or already existed.
    pub fn ensure_chat<S: AsRef<str>>(&self, participant_ids: &[S]) -> Result<Chat> {
        let participants = validate_participants(participant_ids)?;

        let mut state = self.state.write();
        let (pos, created) = state.get_or_insert(&participants);
        let chat = state.chats[pos].clone();
        if created {
            info!("Created chat {}", chat.id);
        } else {
            debug!("Chat {} already exists", chat.id);
        }
        self.broadcast(ServerEvent::ChatUpdated { chat: chat.clone() });

        Ok(chat)
    }

    /// Append a text message and broadcast the updated chat.
    pub fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        if request.from_id.trim().is_empty() {
            return Err(RelayError::MissingSender);
        }
        let content = request.text.trim();
        if content.is_empty() {
            return Err(RelayError::BlankMessage);
        }

        let mut state = self.state.write();
        let pos = state.resolve_for_send(request)?;

        let message = Message::text(request.from_id.as_str(), content);
        let chat = &mut state.chats[pos];
        chat.push_message(message.clone());
        info!(
            "Added message {} from {} to chat {} ({} messages)",
            message.id,
            message.sender_id,
            chat.id,
            chat.messages.len()
        );
        self.broadcast(ServerEvent::ChatUpdated { chat: chat.clone() });

        Ok(message)
    }

    fn broadcast(&self, event: ServerEvent) {
        // No subscribers is not an error
        let _ = self.channel.tx.send(event);
    }
}
