use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use futures::StreamExt;
use relay_common::{Chat, ServerEvent, Snapshot};
use relay_server::{
    app,
    config::{AppState, RelayConfig},
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn relay() -> (Router, AppState) {
    let state = AppState::new(RelayConfig::default());
    (app(state.clone()), state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_ensure_chat_endpoint_is_idempotent() {
    let (router, state) = relay();

    let resp = router
        .clone()
        .oneshot(post_json("/chats", json!({ "participantIds": ["u2", "u1"] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let chat: Chat = serde_json::from_value(body_json(resp.into_body()).await).unwrap();
    assert_eq!(chat.id, "u1-u2");
    assert_eq!(chat.participant_ids, vec!["u2", "u1"]);

    let resp = router
        .oneshot(post_json("/chats", json!({ "participantIds": ["u1", "u2"] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(state.store.chat_count(), 1);
}

#[tokio::test]
async fn test_refused_requests_carry_error_body() {
    let (router, state) = relay();

    let resp = router
        .clone()
        .oneshot(post_json("/chats", json!({ "participantIds": ["u1"] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp.into_body()).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("at least 2"));

    let resp = router
        .clone()
        .oneshot(post_json(
            "/messages",
            json!({ "chatId": "u1-u2", "fromId": "u1", "text": "  " }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = router
        .oneshot(post_json(
            "/messages",
            json!({ "chatId": "mystery", "fromId": "u1", "text": "hi" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.store.chat_count(), 0);
}

#[tokio::test]
async fn test_malformed_body_is_a_bad_request() {
    let (router, state) = relay();

    let request = Request::builder()
        .method("POST")
        .uri("/chats")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"participantIds\": ["))
        .unwrap();
    let resp = router.oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp.into_body()).await;
    assert!(body["error"]["message"].is_string());
    assert_eq!(state.store.chat_count(), 0);
}

#[tokio::test]
async fn test_send_then_bootstrap() {
    let (router, _state) = relay();

    let resp = router
        .clone()
        .oneshot(post_json(
            "/messages",
            json!({ "chatId": "u1-u2", "fromId": "u1", "text": " hi " }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let accepted = body_json(resp.into_body()).await;
    assert_eq!(accepted["chatId"], "u1-u2");

    let resp = router
        .oneshot(Request::get("/state").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let snapshot: Snapshot = serde_json::from_value(body_json(resp.into_body()).await).unwrap();
    assert_eq!(snapshot.users.len(), 3);
    assert_eq!(snapshot.chats.len(), 1);
    assert_eq!(snapshot.chats[0].messages[0].content, "hi");
    assert_eq!(snapshot.chats[0].messages[0].id, accepted["id"].as_str().unwrap());
}

#[tokio::test]
async fn test_subscribe_streams_state_then_updates() {
    let (router, state) = relay();

    let resp = router
        .oneshot(Request::get("/subscribe").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/x-ndjson");
    let mut stream = resp.into_body().into_data_stream();

    let first = stream.next().await.unwrap().unwrap();
    let first = ServerEvent::from_frame(std::str::from_utf8(&first).unwrap().trim_end()).unwrap();
    assert!(matches!(first, ServerEvent::State(_)));

    state.store.ensure_chat(&["u3", "u2"]).unwrap();

    let next = stream.next().await.unwrap().unwrap();
    match ServerEvent::from_frame(std::str::from_utf8(&next).unwrap().trim_end()).unwrap() {
        ServerEvent::ChatUpdated { chat } => assert_eq!(chat.id, "u2-u3"),
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_health_and_users() {
    let (router, _state) = relay();

    let resp = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router
        .oneshot(Request::get("/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let users = body_json(resp.into_body()).await;
    assert_eq!(users[2], json!({ "id": "u3", "name": "User 3" }));
}
