//! Chat Relay Server Library
//!
//! Holds users and chats in memory, derives chat identity from the
//! participant set and broadcasts every mutation to every connected client.

pub mod config;
pub mod error;
pub mod handlers;
pub mod store;

use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppState, RelayConfig};
use handlers::{ensure_chat, get_state, health_check, list_users, send_message, subscribe, ws_handler};

/// Initialize tracing from `RUST_LOG`, falling back to info for the relay.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "relay_server=info,tower_http=info,info".into());
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }
}

/// Build the relay router for a given state.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Event channel
        .route("/ws", get(ws_handler))
        .route("/subscribe", get(subscribe))
        // Request/response surface
        .route("/state", get(get_state))
        .route("/users", get(list_users))
        .route("/chats", post(ensure_chat))
        .route("/messages", post(send_message))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    let config = RelayConfig::from_env();
    let addr = config.addr();
    let state = AppState::new(config);
    info!(
        "Seeded {} users, broadcast capacity {}",
        state.store.users().len(),
        state.config.broadcast_capacity
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Realtime chat relay listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
