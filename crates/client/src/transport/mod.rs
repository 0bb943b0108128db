//! Transport between a client and the relay

pub mod frames;
pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use relay_common::{Chat, SendMessageRequest, ServerEvent, Snapshot};

pub use frames::FrameParser;
pub use http::HttpTransport;

/// Operations a client can ask of the relay.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Fetch the full snapshot.
    async fn bootstrap(&self) -> Result<Snapshot>;

    /// Create-or-fetch a chat; the relay also broadcasts it.
    async fn ensure_chat(&self, participant_ids: &[String]) -> Result<Chat>;

    /// Submit a message. Confirmation arrives only as a `chatUpdated` push.
    async fn send_message(&self, request: &SendMessageRequest) -> Result<()>;

    /// Open the push channel. The receiver closes when the relay goes away.
    async fn subscribe(&self) -> Result<async_channel::Receiver<ServerEvent>>;
}
