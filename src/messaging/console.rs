//! Console chat adapter for local runs.
//!
//! Reads `nickname: message` lines from stdin and prints replies to stdout.
//! Useful for exercising the responder end to end without a real chat client.

use crate::messaging::{HistorySource, ReplySender};
use crate::responder::Responder;
use crate::{
    ConversationKey, HistoryEntry, InboundMessage, MessageKind, MessageOrigin, ReplyHandle,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt as _, BufReader};

pub struct ConsoleChat {
    handle_counter: AtomicU64,
}

impl ConsoleChat {
    pub fn new() -> Self {
        Self {
            handle_counter: AtomicU64::new(0),
        }
    }

    fn next_handle(&self) -> ReplyHandle {
        let id = self.handle_counter.fetch_add(1, Ordering::Relaxed);
        ReplyHandle::new(format!("console-{id}"))
    }

    /// Read stdin until EOF, feeding each line into the responder.
    pub async fn run(&self, responder: &Responder) -> crate::error::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((nickname, content)) = line.split_once(':') else {
                tracing::warn!(%line, "ignoring console input without `nickname:` prefix");
                continue;
            };

            let message = InboundMessage {
                kind: MessageKind::Text,
                origin: MessageOrigin::Counterpart,
                chat_key: ConversationKey::from(nickname.trim()),
                content: content.trim().to_string(),
                handle: self.next_handle(),
                timestamp: chrono::Utc::now(),
            };
            responder.handle_message(message).await;
        }
        Ok(())
    }
}

impl Default for ConsoleChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplySender for ConsoleChat {
    async fn send(&self, handle: &ReplyHandle, text: &str) -> crate::error::Result<()> {
        println!("[reply to {handle}] {text}");
        Ok(())
    }
}

#[async_trait]
impl HistorySource for ConsoleChat {
    async fn fetch(&self, _key: &ConversationKey) -> crate::error::Result<Vec<HistoryEntry>> {
        // A console session has no prior transcript to load.
        Ok(Vec::new())
    }
}
