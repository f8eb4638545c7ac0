//! Bounded rolling history per conversation, used as generation context.

use crate::{ConversationKey, HistoryEntry, MessageOrigin};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// In-memory message history, bounded per conversation.
///
/// Each conversation keeps at most `2 × window` entries; the oldest entries
/// are evicted first. The outer map lock is held only long enough to fetch a
/// conversation's cell, so unrelated conversations never contend.
#[derive(Clone)]
pub struct HistoryStore {
    window: usize,
    inner: Arc<RwLock<HashMap<ConversationKey, Arc<Mutex<VecDeque<HistoryEntry>>>>>>,
}

impl HistoryStore {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Maximum entries retained per conversation.
    fn capacity(&self) -> usize {
        self.window * 2
    }

    async fn cell(&self, key: &ConversationKey) -> Arc<Mutex<VecDeque<HistoryEntry>>> {
        if let Some(cell) = self.inner.read().await.get(key) {
            return Arc::clone(cell);
        }
        let mut map = self.inner.write().await;
        Arc::clone(map.entry(Arc::clone(key)).or_default())
    }

    /// Append one entry, evicting the oldest entries past the bound.
    pub async fn append(
        &self,
        key: &ConversationKey,
        content: impl Into<String>,
        origin: MessageOrigin,
    ) {
        let cell = self.cell(key).await;
        let mut entries = cell.lock().await;
        entries.push_back(HistoryEntry::new(content, origin));
        while entries.len() > self.capacity() {
            entries.pop_front();
        }
    }

    /// The last `min(limit, len)` entries in arrival order, oldest first.
    /// Unknown keys yield an empty vec.
    pub async fn recent(&self, key: &ConversationKey, limit: usize) -> Vec<HistoryEntry> {
        let Some(cell) = self.inner.read().await.get(key).map(Arc::clone) else {
            return Vec::new();
        };
        let entries = cell.lock().await;
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Bulk-initialize a conversation from a prior source of truth, replacing
    /// any in-memory state for that key. The same trimming bound applies.
    pub async fn seed(&self, key: &ConversationKey, entries: Vec<HistoryEntry>) {
        let cell = self.cell(key).await;
        let mut stored = cell.lock().await;
        let skip = entries.len().saturating_sub(self.capacity());
        *stored = entries.into_iter().skip(skip).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ConversationKey {
        ConversationKey::from(name)
    }

    #[tokio::test]
    async fn append_enforces_double_window_bound() {
        let store = HistoryStore::new(2);
        let alice = key("Alice");

        for i in 0..6 {
            store
                .append(&alice, format!("msg-{i}"), MessageOrigin::Counterpart)
                .await;
        }

        let entries = store.recent(&alice, 10).await;
        assert_eq!(entries.len(), 4, "history must not exceed 2 × window");
        let contents: Vec<_> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["msg-2", "msg-3", "msg-4", "msg-5"]);
    }

    #[tokio::test]
    async fn recent_returns_tail_oldest_first() {
        let store = HistoryStore::new(20);
        let bob = key("Bob");

        store.append(&bob, "one", MessageOrigin::Counterpart).await;
        store.append(&bob, "two", MessageOrigin::Own).await;
        store.append(&bob, "three", MessageOrigin::Counterpart).await;

        let entries = store.recent(&bob, 2).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].content, "two");
        assert_eq!(entries[0].origin, MessageOrigin::Own);
        assert_eq!(entries[1].content, "three");
    }

    #[tokio::test]
    async fn recent_on_unknown_key_is_empty() {
        let store = HistoryStore::new(20);
        assert!(store.recent(&key("nobody"), 5).await.is_empty());
    }

    #[tokio::test]
    async fn seed_overwrites_and_trims() {
        let store = HistoryStore::new(2);
        let alice = key("Alice");
        store.append(&alice, "stale", MessageOrigin::Own).await;

        let seeded: Vec<_> = (0..4)
            .map(|i| HistoryEntry::new(format!("seed-{i}"), MessageOrigin::Counterpart))
            .collect();
        store.seed(&alice, seeded).await;

        // window = 2, so the bound is 4 and all seeded entries fit; the stale
        // entry is gone and recent(2) yields only the last two, oldest first.
        let entries = store.recent(&alice, 2).await;
        let contents: Vec<_> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["seed-2", "seed-3"]);
    }

    #[tokio::test]
    async fn conversations_do_not_interfere() {
        let store = HistoryStore::new(1);
        let alice = key("Alice");
        let bob = key("Bob");

        store.append(&alice, "a1", MessageOrigin::Counterpart).await;
        store.append(&alice, "a2", MessageOrigin::Counterpart).await;
        store.append(&alice, "a3", MessageOrigin::Counterpart).await;
        store.append(&bob, "b1", MessageOrigin::Counterpart).await;

        assert_eq!(store.recent(&alice, 10).await.len(), 2);
        assert_eq!(store.recent(&bob, 10).await.len(), 1);
    }
}
