//! Chat storage module
//!
//! Holds the authoritative users and chats for the lifetime of the process
//! and fans every mutation out to subscribers.

pub mod memory_store;

pub use memory_store::{ChatStore, UpdateChannel};
