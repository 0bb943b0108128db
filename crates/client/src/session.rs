//! Session driver: one mirror, at most one relay connection
//!
//! Without a transport every operation runs against the mirror alone, so the
//! same identity rules hold standalone.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::mirror::ChatMirror;
use crate::transport::{HttpTransport, RelayTransport};
use relay_common::{chat_id, Chat, Message, RelayError, SendMessageRequest, ServerEvent};
use std::sync::Arc;
use tracing::{info, warn};

pub struct ClientSession {
    mirror: ChatMirror,
    transport: Option<Arc<dyn RelayTransport>>,
}

impl ClientSession {
    /// Session that never talks to a relay.
    pub fn standalone(config: &ClientConfig) -> Self {
        Self {
            mirror: ChatMirror::standalone(config.user_id.clone(), config.echo_window_ms),
            transport: None,
        }
    }

    /// Session over an arbitrary transport; call [`connect`](Self::connect) next.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn RelayTransport>) -> Self {
        Self {
            mirror: ChatMirror::new(config.user_id.clone(), config.echo_window_ms),
            transport: Some(transport),
        }
    }

    /// Session over HTTP to `config.server_url`. Falls back to standalone
    /// when the client cannot be built.
    pub fn http(config: &ClientConfig) -> Self {
        match HttpTransport::new(config.server_url.clone()) {
            Ok(transport) => Self::with_transport(config, Arc::new(transport)),
            Err(e) => {
                warn!("Failed to build HTTP transport: {}", e);
                Self::standalone(config)
            }
        }
    }

    pub fn mirror(&self) -> &ChatMirror {
        &self.mirror
    }

    pub fn mirror_mut(&mut self) -> &mut ChatMirror {
        &mut self.mirror
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Bootstrap from the relay and open the push channel.
    ///
    /// On failure the session drops its transport and continues standalone
    /// from the seeded roster.
    pub async fn connect(&mut self) -> Option<async_channel::Receiver<ServerEvent>> {
        let transport = self.transport.clone()?;

        let result = async {
            let snapshot = transport.bootstrap().await?;
            self.mirror.apply_snapshot(snapshot);
            transport.subscribe().await
        }
        .await;

        match result {
            Ok(rx) => {
                info!("Connected to relay, {} chats", self.mirror.chats().len());
                Some(rx)
            }
            Err(e) => {
                warn!("Relay unreachable, running standalone: {}", e);
                self.transport = None;
                self.mirror = ChatMirror::standalone(
                    self.mirror.current_user().to_string(),
                    self.mirror.echo_window_ms(),
                );
                None
            }
        }
    }

    /// Route a pushed event into the mirror.
    pub fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::State(snapshot) => self.mirror.apply_snapshot(snapshot),
            ServerEvent::ChatUpdated { chat } | ServerEvent::Ack { chat, .. } => {
                self.mirror.apply_chat_updated(chat)
            }
            ServerEvent::Error { message, .. } => warn!("Relay refused a request: {}", message),
        }
    }

    /// Create-or-fetch a chat, remotely when connected.
    ///
    /// An unreachable relay degrades to the local path; an explicit refusal
    /// is returned to the caller.
    pub async fn ensure_chat<S: AsRef<str>>(&mut self, participant_ids: &[S]) -> Result<Chat> {
        let participants: Vec<String> = participant_ids.iter().map(|s| s.as_ref().to_string()).collect();

        if let Some(transport) = self.transport.clone() {
            match transport.ensure_chat(&participants).await {
                Ok(chat) => {
                    self.mirror.apply_chat_updated(chat.clone());
                    return Ok(chat);
                }
                Err(e) if e.is_unreachable() => {
                    warn!("ensureChat failed, creating locally: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(self.mirror.ensure_chat_local(&participants)?)
    }

    /// Select the chat with `other`, creating it when needed. `other` must be
    /// on the roster.
    pub async fn open_chat_with(&mut self, other: &str) -> Result<String> {
        let me = self.mirror.current_user().to_string();
        if other == me {
            return Err(RelayError::InvalidParticipant(other.to_string()).into());
        }
        if self.mirror.user(other).is_none() {
            return Err(ClientError::UnknownUser(other.to_string()));
        }

        let id = chat_id(&[me.as_str(), other]);
        if self.mirror.chat(&id).is_none() {
            self.ensure_chat(&[me.as_str(), other]).await?;
        }
        self.mirror.select_chat(&id);
        Ok(id)
    }

    /// Open the initial chat once the roster is known and nothing is selected.
    pub async fn auto_open(&mut self) -> Result<Option<String>> {
        let Some(target) = self.mirror.auto_select_target() else {
            return Ok(None);
        };
        let chat = self.ensure_chat(&target).await?;
        self.mirror.select_chat(&chat.id);
        Ok(Some(chat.id))
    }

    /// Send into the selected chat: local append first, then the relay.
    ///
    /// A failed relay request is logged and not retried; the local copy then
    /// lasts only until the relay next pushes that chat.
    pub async fn send(&mut self, text: &str) -> Result<Message> {
        let chat = self
            .mirror
            .selected_chat()
            .cloned()
            .ok_or(ClientError::NoChatSelected)?;

        let Some(transport) = self.transport.clone() else {
            return Ok(self.mirror.append_local(&chat.id, text)?);
        };

        let message = self.mirror.optimistic_send(&chat.id, text)?;
        let request = SendMessageRequest {
            chat_id: chat.id.clone(),
            from_id: message.sender_id.clone(),
            text: message.content.clone(),
            participant_ids: Some(chat.participant_ids.clone()),
        };
        if let Err(e) = transport.send_message(&request).await {
            warn!("sendMessage to {} failed: {}", chat.id, e);
            self.mirror.discard_pending(&message.id);
        }

        Ok(message)
    }
}
