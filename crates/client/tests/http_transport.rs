//! HttpTransport against a live relay on a loopback port

use relay_client::{ClientConfig, ClientError, ClientSession, HttpTransport, RelayTransport};
use relay_common::{SendMessageRequest, ServerEvent};
use relay_server::config::{AppState, RelayConfig};
use std::time::Duration;

async fn spawn_relay() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = relay_server::app(AppState::new(RelayConfig::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn next_event(rx: &async_channel::Receiver<ServerEvent>) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("subscription closed")
}

#[tokio::test]
async fn test_http_round_trip_through_relay() {
    let url = spawn_relay().await;
    let transport = HttpTransport::new(url).unwrap();

    let snapshot = transport.bootstrap().await.unwrap();
    assert_eq!(snapshot.users.len(), 3);
    assert!(snapshot.chats.is_empty());

    let rx = transport.subscribe().await.unwrap();
    assert!(matches!(next_event(&rx).await, ServerEvent::State(_)));

    let chat = transport
        .ensure_chat(&["u2".to_string(), "u1".to_string()])
        .await
        .unwrap();
    assert_eq!(chat.id, "u1-u2");
    match next_event(&rx).await {
        ServerEvent::ChatUpdated { chat } => assert!(chat.messages.is_empty()),
        other => panic!("unexpected event {:?}", other),
    }

    transport
        .send_message(&SendMessageRequest {
            chat_id: "u1-u2".into(),
            from_id: "u1".into(),
            text: "over the wire".into(),
            participant_ids: None,
        })
        .await
        .unwrap();
    match next_event(&rx).await {
        ServerEvent::ChatUpdated { chat } => {
            assert_eq!(chat.messages.len(), 1);
            assert_eq!(chat.messages[0].content, "over the wire");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_http_refusals_carry_status_and_message() {
    let url = spawn_relay().await;
    let transport = HttpTransport::new(url).unwrap();

    match transport.ensure_chat(&["u1".to_string()]).await {
        Err(ClientError::Status { status, message }) => {
            assert_eq!(status, 400);
            assert!(!message.is_empty());
        }
        other => panic!("unexpected result {:?}", other),
    }

    let unknown = transport
        .send_message(&SendMessageRequest {
            chat_id: "nobody".into(),
            from_id: "u1".into(),
            text: "hello?".into(),
            participant_ids: None,
        })
        .await;
    assert!(matches!(unknown, Err(ClientError::Status { status: 404, .. })));
}

#[tokio::test]
async fn test_unreachable_relay_falls_back_to_standalone() {
    let config = ClientConfig {
        server_url: "http://127.0.0.1:1".to_string(),
        ..ClientConfig::default()
    };
    let mut session = ClientSession::http(&config);
    assert!(session.connect().await.is_none());
    assert!(!session.is_connected());
    assert_eq!(session.mirror().selected_chat().unwrap().id, "u1-u2");

    session.send("still works").await.unwrap();
    assert_eq!(session.mirror().chat("u1-u2").unwrap().messages.len(), 1);
}
