//! Terminal driver for the relay client
//!
//! Plain lines are sent to the selected chat. Commands:
//! `/as <user>`, `/chat <user>`, `/select <chat>`, `/chats`, `/users`, `/quit`.

use relay_client::{ClientConfig, ClientSession};
use relay_common::ServerEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "relay_client=info,warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_selected(session: &ClientSession) {
    let mirror = session.mirror();
    let Some(chat) = mirror.selected_chat() else {
        println!("(no chat selected)");
        return;
    };
    println!("== {} [{}] ==", chat.title(mirror.users()), chat.id);
    for message in &chat.messages {
        let sender = mirror
            .user(&message.sender_id)
            .map(|u| u.name.as_str())
            .unwrap_or(message.sender_id.as_str());
        let marker = if message.sender_id == mirror.current_user() { ">" } else { " " };
        println!("{} {}: {}", marker, sender, message.content);
    }
}

fn print_chats(session: &ClientSession) {
    let mirror = session.mirror();
    if mirror.chats().is_empty() {
        println!("No chats yet");
    }
    for chat in mirror.chats() {
        let active = if mirror.selected_chat().map(|c| c.id == chat.id).unwrap_or(false) { "*" } else { " " };
        println!("{} {} [{}] {}", active, chat.title(mirror.users()), chat.id, chat.preview());
    }
}

async fn handle_line(session: &mut ClientSession, line: &str) -> bool {
    let line = line.trim();
    let (command, arg) = line.split_once(' ').map(|(c, a)| (c, a.trim())).unwrap_or((line, ""));

    match command {
        "" => {}
        "/quit" => return false,
        "/users" => {
            for user in session.mirror().users() {
                println!("{} {}", user.id, user.name);
            }
        }
        "/chats" => print_chats(session),
        "/as" => {
            if session.mirror_mut().set_current_user(arg) {
                println!("Sending as {}", arg);
            } else {
                println!("Unknown user {:?}", arg);
            }
        }
        "/select" => {
            if session.mirror_mut().select_chat(arg) {
                print_selected(session);
            } else {
                println!("Unknown chat {:?}", arg);
            }
        }
        "/chat" => match session.open_chat_with(arg).await {
            Ok(_) => print_selected(session),
            Err(e) => println!("Cannot open chat: {}", e),
        },
        _ => match session.send(line).await {
            Ok(_) => print_selected(session),
            Err(e) => println!("Not sent: {}", e),
        },
    }
    true
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env();
    info!("Relay client for {} at {}", config.user_id, config.server_url);

    let mut session = ClientSession::http(&config);
    let events = session.connect().await;
    if let Err(e) = session.auto_open().await {
        warn!("Could not open an initial chat: {}", e);
    }
    print_chats(&session);
    print_selected(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut subscribed = events.is_some();
    let events = events.unwrap_or_else(|| async_channel::bounded::<ServerEvent>(1).1);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_line(&mut session, &line).await {
                        break;
                    }
                }
                None => break,
            },
            event = events.recv(), if subscribed => match event {
                Ok(event) => {
                    let touches_selected = match &event {
                        ServerEvent::ChatUpdated { chat } => session
                            .mirror()
                            .selected_chat()
                            .map(|c| c.id == chat.id)
                            .unwrap_or(false),
                        _ => true,
                    };
                    session.handle_event(event);
                    if touches_selected {
                        print_selected(&session);
                    }
                }
                Err(_) => {
                    warn!("Relay subscription closed, continuing with local state");
                    subscribed = false;
                }
            },
        }
    }

    Ok(())
}
