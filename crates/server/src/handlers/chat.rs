//! Request/response chat endpoints
//!
//! Every mutation here is also broadcast by the store, so HTTP callers get
//! the same `chatUpdated` frames as WebSocket peers.

use crate::{config::AppState, error::Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use relay_common::{Chat, EnsureChatRequest, SendMessageRequest, Snapshot, User};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Body returned once a message has been appended
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAccepted {
    pub id: String,
    pub chat_id: String,
}

/// GET /state
///
/// Bootstrap snapshot: all users and all chats with full history.
pub async fn get_state(State(state): State<AppState>) -> Json<Snapshot> {
    let snapshot = state.store.bootstrap();
    info!("GET /state ({} chats)", snapshot.chats.len());
    Json(snapshot)
}

/// GET /users
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<User>> {
    Json(state.store.users())
}

/// POST /chats
pub async fn ensure_chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EnsureChatRequest>, JsonRejection>,
) -> Result<Json<Chat>> {
    let Json(input) = payload?;
    info!("POST /chats {:?}", input.participant_ids);

    let chat = state.store.ensure_chat(&input.participant_ids).map_err(|e| {
        warn!("Refused ensureChat: {}", e);
        e
    })?;
    Ok(Json(chat))
}

/// POST /messages
pub async fn send_message(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageAccepted>)> {
    let Json(input) = payload?;
    info!("POST /messages chat={} from={}", input.chat_id, input.from_id);

    let message = state.store.send_message(&input).map_err(|e| {
        warn!("Refused sendMessage: {}", e);
        e
    })?;

    // Resolution may have derived the id from participantIds
    let chat_id = match input.participant_ids.as_deref() {
        Some(ids) if input.chat_id.is_empty() => relay_common::chat_id(ids),
        _ => input.chat_id,
    };
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageAccepted {
            id: message.id,
            chat_id,
        }),
    ))
}

pub async fn health_check() -> &'static str {
    "OK - Chat Relay"
}
