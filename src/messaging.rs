//! Collaborator interfaces to the chat application.
//!
//! The binding that talks to the actual chat client lives outside this crate;
//! it normalizes raw messages into [`crate::InboundMessage`] and implements
//! these traits. A console adapter is included for local runs.

pub mod console;

pub use console::ConsoleChat;

use crate::{ConversationKey, HistoryEntry, ReplyHandle};
use async_trait::async_trait;

/// Delivers a reply addressed to a specific earlier message.
///
/// Fire-and-forget from the core's perspective: a send failure is logged at
/// the dispatcher boundary and never propagated further.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send(&self, handle: &ReplyHandle, text: &str) -> crate::error::Result<()>;
}

/// Supplies prior conversation history once at startup, oldest first.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch(&self, key: &ConversationKey) -> crate::error::Result<Vec<HistoryEntry>>;
}
