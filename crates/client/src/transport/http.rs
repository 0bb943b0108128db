use super::{FrameParser, RelayTransport};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use relay_common::{Chat, EnsureChatRequest, SendMessageRequest, ServerEvent, Snapshot};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Relay transport over plain HTTP plus the streaming `/subscribe` response.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // No overall timeout: the subscription stays open indefinitely
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Turn a non-success status into [`ClientError::Status`], keeping the
/// relay's `{"error": {"message"}}` text when present.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RelayTransport for HttpTransport {
    async fn bootstrap(&self) -> Result<Snapshot> {
        let response = self.client.get(self.url("/state")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn ensure_chat(&self, participant_ids: &[String]) -> Result<Chat> {
        let response = self
            .client
            .post(self.url("/chats"))
            .json(&EnsureChatRequest::new(participant_ids))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<()> {
        let response = self
            .client
            .post(self.url("/messages"))
            .json(request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<async_channel::Receiver<ServerEvent>> {
        let url = self.url("/subscribe");
        info!("[Subscribe] GET {}", url);
        let response = check(self.client.get(&url).send().await?).await?;

        let (tx, rx) = async_channel::bounded(100);
        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut parser = FrameParser::new();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(chunk) => {
                        for event in parser.feed(&chunk) {
                            match event {
                                Ok(event) => {
                                    if tx.send(event).await.is_err() {
                                        debug!("[Subscribe] receiver dropped");
                                        return;
                                    }
                                }
                                Err(e) => warn!("[Subscribe] skipping bad frame: {}", e),
                            }
                        }
                    }
                    Err(e) => {
                        error!("[Subscribe] stream error: {}", e);
                        break;
                    }
                }
            }
            debug!("[Subscribe] stream ended");
        });

        Ok(rx)
    }
}
