//! Debounced auto-reply core.
//!
//! Incoming chat messages are collected per conversation, coalesced during a
//! quiet period, and answered with a single generated reply per burst. The
//! crate root holds the shared message types; the heavy lifting lives in
//! [`responder`] (scheduling and dispatch) and [`conversation`] (the bounded
//! history and pending-batch stores).

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod messaging;
pub mod responder;
pub mod transcript;

use std::sync::Arc;

/// Stable identifier of a chat thread (a nickname or room id).
pub type ConversationKey = Arc<str>;

/// Coarse message kind as reported by the chat binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Other,
}

impl MessageKind {
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Other => "other",
        }
    }
}

/// Who produced a message, from the responder's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Sent by us (a prior reply, or the account owner typing).
    Own,
    /// Sent by the conversation counterpart.
    Counterpart,
}

impl MessageOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            MessageOrigin::Own => "self",
            MessageOrigin::Counterpart => "counterpart",
        }
    }
}

/// Opaque reference to a delivered message, used to address a reply to it.
/// The chat binding mints these; the core never inspects the contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHandle(Arc<str>);

impl ReplyHandle {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReplyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized inbound message as delivered by the chat binding.
///
/// The binding does all structural parsing; the core only sees this shape.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub kind: MessageKind,
    pub origin: MessageOrigin,
    pub chat_key: ConversationKey,
    pub content: String,
    pub handle: ReplyHandle,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// One entry of a conversation's rolling history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub content: String,
    pub origin: MessageOrigin,
}

impl HistoryEntry {
    pub fn new(content: impl Into<String>, origin: MessageOrigin) -> Self {
        Self {
            content: content.into(),
            origin,
        }
    }
}

/// A message awaiting its debounce window, queued for the next flush.
#[derive(Debug, Clone)]
pub struct PendingMessage {
    pub content: String,
    pub handle: ReplyHandle,
}
