//! Handlers for the relay server
//!
//! HTTP endpoints, the streaming subscription and the WebSocket event channel
//! all drive the same [`ChatStore`](crate::store::ChatStore).

pub mod chat;
pub mod subscribe;
pub mod ws;

// Re-export AppState from config
pub use crate::config::AppState;

pub use chat::{ensure_chat, get_state, health_check, list_users, send_message};
pub use subscribe::subscribe;
pub use ws::{dispatch, ws_handler};
