//! Streaming subscription handler
//!
//! `GET /subscribe` keeps the response open and writes one JSON
//! [`ServerEvent`] per line: a `state` frame first, then every `chatUpdated`
//! broadcast. A blank line is a heartbeat.

use crate::{
    config::AppState,
    error::{Error, Result},
};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use relay_common::ServerEvent;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, error, info};

pub const NDJSON: &str = "application/x-ndjson";

fn frame(event: &ServerEvent) -> Option<String> {
    match event.to_frame() {
        Ok(json) => Some(format!("{}\n", json)),
        Err(e) => {
            error!("[Subscribe] Failed to encode event: {}", e);
            None
        }
    }
}

/// GET /subscribe
pub async fn subscribe(State(state): State<AppState>) -> Result<Response> {
    let heartbeat = state.config.heartbeat_secs;
    info!(
        "[Subscribe] new subscriber (heartbeat={}s, total={})",
        heartbeat,
        state.store.subscriber_count() + 1
    );

    // Subscribe before snapshotting so nothing falls between the two
    let mut rx = state.store.subscribe();
    let store = state.store.clone();

    let stream = async_stream::stream! {
        if let Some(line) = frame(&ServerEvent::State(store.bootstrap())) {
            yield Ok::<_, Infallible>(line);
        }

        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(heartbeat));
        // The first tick completes immediately
        heartbeat_interval.tick().await;

        loop {
            tokio::select! {
                update = store.recv_update(&mut rx) => match update {
                    Some(event) => {
                        if let Some(line) = frame(&event) {
                            yield Ok::<_, Infallible>(line);
                        }
                    }
                    None => {
                        debug!("[Subscribe] broadcast channel closed");
                        break;
                    }
                },
                _ = heartbeat_interval.tick() => {
                    yield Ok::<_, Infallible>("\n".to_string());
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, NDJSON)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| {
            error!("[Subscribe] Failed to build response: {}", e);
            Error::Internal(e.to_string())
        })
}
