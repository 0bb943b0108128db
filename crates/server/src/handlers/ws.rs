//! WebSocket event channel
//!
//! Each socket gets its own writer task fed by two sources: direct replies
//! (`state`, `ack`, `error`) for this peer and the shared `chatUpdated`
//! broadcast.

use crate::config::AppState;
use crate::store::ChatStore;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use relay_common::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Apply one client event to the store and produce the direct reply, if any.
///
/// Broadcasts are emitted by the store itself; only the caller-facing answer
/// is returned here. `sendMessage` never gets a direct reply on success.
pub fn dispatch(store: &ChatStore, event: ClientEvent) -> Option<ServerEvent> {
    match event {
        ClientEvent::Bootstrap => Some(ServerEvent::State(store.bootstrap())),
        ClientEvent::EnsureChat(request) => match store.ensure_chat(&request.participant_ids) {
            Ok(chat) => request.ack.map(|ack| ServerEvent::Ack { ack, chat }),
            Err(e) => {
                warn!("[WS] refused ensureChat: {}", e);
                Some(ServerEvent::Error {
                    message: e.to_string(),
                    ack: request.ack,
                })
            }
        },
        ClientEvent::SendMessage(request) => match store.send_message(&request) {
            Ok(_) => None,
            Err(e) => {
                warn!("[WS] refused sendMessage: {}", e);
                Some(ServerEvent::Error {
                    message: e.to_string(),
                    ack: None,
                })
            }
        },
    }
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("[WS] peer connected ({} subscribers)", state.store.subscriber_count());

    let (mut sink, mut stream) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let mut updates = state.store.subscribe();
    let store = state.store.clone();

    let writer = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(reply) = reply_rx.recv() => reply,
                update = store.recv_update(&mut updates) => match update {
                    Some(event) => event,
                    None => break,
                },
            };

            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("[WS] failed to encode event: {}", e);
                    continue;
                }
            };
            if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            WsMessage::Text(text) => {
                let reply = match serde_json::from_str::<ClientEvent>(text.as_str()) {
                    Ok(event) => {
                        debug!("[WS] <- {:?}", event);
                        dispatch(&state.store, event)
                    }
                    Err(e) => {
                        warn!("[WS] malformed event: {}", e);
                        Some(ServerEvent::Error {
                            message: format!("Malformed event: {}", e),
                            ack: None,
                        })
                    }
                };
                if let Some(reply) = reply {
                    if reply_tx.send(reply).is_err() {
                        break;
                    }
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    info!("[WS] peer disconnected");
}
