//! Per-conversation state: rolling history and pending reply batches.

pub mod history;
pub mod pending;

pub use history::HistoryStore;
pub use pending::PendingStore;
