//! Append-only transcript log.
//!
//! Every message and every auto-reply goes to a plain text file. All writes
//! are fire-and-forget: they spawn a task and never block or fail message
//! processing.

use crate::{ConversationKey, HistoryEntry, InboundMessage, MessageKind, MessageOrigin};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt as _;

const SNAPSHOT_RULE: &str =
    "============================================================";

#[derive(Clone)]
pub struct TranscriptLogger {
    path: Arc<PathBuf>,
}

impl TranscriptLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn append(&self, text: String) {
        let path = Arc::clone(&self.path);
        tokio::spawn(async move {
            let result = async {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path.as_ref())
                    .await?;
                file.write_all(text.as_bytes()).await
            }
            .await;

            if let Err(error) = result {
                tracing::warn!(%error, path = %path.display(), "failed to append to transcript log");
            }
        });
    }

    /// Record an inbound message. Fire-and-forget.
    pub fn record_message(&self, message: &InboundMessage) {
        let line = format!(
            "[{}][{} {}]{} - {}\n",
            Self::timestamp(),
            message.kind.label(),
            message.origin.label(),
            message.chat_key,
            message.content,
        );
        self.append(line);
    }

    /// Record an auto-reply sent by the dispatcher. Fire-and-forget.
    pub fn record_reply(&self, key: &ConversationKey, content: &str) {
        let line = format!(
            "[AUTO-REPLY][{}][{} {}]{} - {}\n",
            Self::timestamp(),
            MessageKind::Text.label(),
            MessageOrigin::Own.label(),
            key,
            content,
        );
        self.append(line);
    }

    /// Record the history snapshot loaded for a conversation at startup.
    /// Fire-and-forget.
    pub fn record_snapshot(&self, key: &ConversationKey, entries: &[HistoryEntry]) {
        let mut block = format!(
            "\n{SNAPSHOT_RULE}\n[HISTORY SNAPSHOT] {} - {}\n{SNAPSHOT_RULE}\n",
            key,
            Self::timestamp(),
        );
        for entry in entries {
            block.push_str(&format!(
                "[{}]{} - {}\n",
                entry.origin.label(),
                key,
                entry.content,
            ));
        }
        block.push_str(SNAPSHOT_RULE);
        block.push('\n');
        self.append(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplyHandle;
    use std::time::Duration;

    fn temp_log_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "replybot-transcript-{name}-{}.txt",
            std::process::id()
        ))
    }

    async fn read_log_eventually(path: &PathBuf, needle: &str) -> String {
        // Writes are fire-and-forget, so poll briefly for the spawned task.
        for _ in 0..50 {
            if let Ok(content) = tokio::fs::read_to_string(path).await
                && content.contains(needle)
            {
                return content;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("transcript log never contained {needle:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn records_messages_and_replies() {
        let path = temp_log_path("messages");
        let _ = tokio::fs::remove_file(&path).await;
        let logger = TranscriptLogger::new(&path);

        let alice = ConversationKey::from("Alice");
        logger.record_message(&InboundMessage {
            kind: MessageKind::Text,
            origin: MessageOrigin::Counterpart,
            chat_key: Arc::clone(&alice),
            content: "hi".into(),
            handle: ReplyHandle::new("m1"),
            timestamp: chrono::Utc::now(),
        });
        logger.record_reply(&alice, "hello!");

        let content = read_log_eventually(&path, "hello!").await;
        assert!(content.contains("[text counterpart]Alice - hi"));
        assert!(content.contains("[AUTO-REPLY]"));
        assert!(content.contains("[text self]Alice - hello!"));

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn snapshot_block_lists_every_entry() {
        let path = temp_log_path("snapshot");
        let _ = tokio::fs::remove_file(&path).await;
        let logger = TranscriptLogger::new(&path);

        let bob = ConversationKey::from("Bob");
        logger.record_snapshot(
            &bob,
            &[
                HistoryEntry::new("old question", MessageOrigin::Counterpart),
                HistoryEntry::new("old answer", MessageOrigin::Own),
            ],
        );

        let content = read_log_eventually(&path, "old answer").await;
        assert!(content.contains("[HISTORY SNAPSHOT] Bob"));
        assert!(content.contains("[counterpart]Bob - old question"));
        assert!(content.contains("[self]Bob - old answer"));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
