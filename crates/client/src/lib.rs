//! Client side of the chat relay
//!
//! [`ChatMirror`] keeps a local copy of users and chats, applies sends
//! optimistically and reconciles server pushes by chat id. [`ClientSession`]
//! drives a mirror against a [`RelayTransport`], or alone when no relay is
//! reachable.

pub mod config;
pub mod error;
pub mod mirror;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use mirror::ChatMirror;
pub use session::ClientSession;
pub use transport::{HttpTransport, RelayTransport};
