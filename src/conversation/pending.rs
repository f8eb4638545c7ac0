//! Queues of messages awaiting their debounce window.

use crate::{ConversationKey, PendingMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Per-conversation queues of not-yet-answered messages.
///
/// `drain_and_clear` snapshots and empties a queue under the same lock, so a
/// concurrent `enqueue` either lands in the drained batch or in the fresh
/// queue for the next one — never both, never neither.
#[derive(Clone)]
pub struct PendingStore {
    inner: Arc<RwLock<HashMap<ConversationKey, Arc<Mutex<Vec<PendingMessage>>>>>>,
}

impl PendingStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn cell(&self, key: &ConversationKey) -> Arc<Mutex<Vec<PendingMessage>>> {
        if let Some(cell) = self.inner.read().await.get(key) {
            return Arc::clone(cell);
        }
        let mut map = self.inner.write().await;
        Arc::clone(map.entry(Arc::clone(key)).or_default())
    }

    /// Append a message to the conversation's queue.
    pub async fn enqueue(&self, key: &ConversationKey, message: PendingMessage) {
        let cell = self.cell(key).await;
        cell.lock().await.push(message);
    }

    /// Atomically take the full queue for a key, leaving it empty. An empty
    /// queue drains to an empty vec; callers treat that as nothing to do.
    pub async fn drain_and_clear(&self, key: &ConversationKey) -> Vec<PendingMessage> {
        let Some(cell) = self.inner.read().await.get(key).map(Arc::clone) else {
            return Vec::new();
        };
        let mut queue = cell.lock().await;
        std::mem::take(&mut *queue)
    }
}

impl Default for PendingStore {
    fn default() -> Self {
        Self::new()
    }
}
