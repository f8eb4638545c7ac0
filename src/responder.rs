//! Auto-reply orchestration: message intake, per-conversation scheduling,
//! and flush dispatch.

pub(crate) mod dispatch;
pub(crate) mod prompt;
pub(crate) mod runtime;

use crate::config::{Config, ConversationConfig, ReplyDelayConfig};
use crate::conversation::{HistoryStore, PendingStore};
use crate::llm::Generator;
use crate::messaging::{HistorySource, ReplySender};
use crate::transcript::TranscriptLogger;
use crate::{ConversationKey, InboundMessage, MessageKind, MessageOrigin, PendingMessage};
use runtime::{ConversationScheduler, SchedulerEvent, SchedulerHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};

/// Shared collaborators handed to every scheduler and flush task.
pub(crate) struct ResponderDeps {
    pub(crate) history: HistoryStore,
    pub(crate) pending: PendingStore,
    pub(crate) generator: Arc<dyn Generator>,
    pub(crate) sender: Arc<dyn ReplySender>,
    pub(crate) transcript: TranscriptLogger,
    pub(crate) history_window: usize,
    pub(crate) fallback_reply: String,
    pub(crate) reply_delay: ReplyDelayConfig,
}

/// The responder facade the chat binding calls into.
///
/// Intake is cheap: it appends to the stores, then notifies the conversation's
/// scheduler. All long-latency work (generation, the natural delay, delivery)
/// happens on per-conversation flush tasks.
pub struct Responder {
    deps: Arc<ResponderDeps>,
    conversations: HashMap<ConversationKey, Arc<ConversationConfig>>,
    actors: Mutex<HashMap<ConversationKey, SchedulerHandle>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Responder {
    pub fn new(
        config: &Config,
        generator: Arc<dyn Generator>,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let deps = Arc::new(ResponderDeps {
            history: HistoryStore::new(config.history_window),
            pending: PendingStore::new(),
            generator,
            sender,
            transcript: TranscriptLogger::new(config.log_file.clone()),
            history_window: config.history_window,
            fallback_reply: config.fallback_reply.clone(),
            reply_delay: config.reply_delay,
        });

        Self {
            deps,
            conversations: config.conversation_map(),
            actors: Mutex::new(HashMap::new()),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.deps.history
    }

    /// Load prior history for every configured conversation. A failure for one
    /// conversation is logged and that conversation starts empty; the rest
    /// proceed.
    pub async fn seed_from(&self, source: &dyn HistorySource) {
        for key in self.conversations.keys() {
            match source.fetch(key).await {
                Ok(entries) => {
                    if entries.is_empty() {
                        continue;
                    }
                    tracing::info!(
                        conversation = %key,
                        count = entries.len(),
                        "loaded startup history"
                    );
                    self.deps.transcript.record_snapshot(key, &entries);
                    self.deps.history.seed(key, entries).await;
                }
                Err(error) => {
                    tracing::warn!(
                        conversation = %key,
                        %error,
                        "failed to load startup history, starting empty"
                    );
                }
            }
        }
    }

    /// Intake path, called synchronously per delivered message.
    ///
    /// Every message lands in the transcript log and the history store. Only
    /// text from the counterpart of an enabled, configured conversation
    /// engages the reply path.
    pub async fn handle_message(&self, message: InboundMessage) {
        if *self.shutdown_tx.borrow() {
            tracing::debug!(conversation = %message.chat_key, "message dropped during shutdown");
            return;
        }

        self.deps.transcript.record_message(&message);
        self.deps
            .history
            .append(&message.chat_key, message.content.clone(), message.origin)
            .await;

        if message.kind != MessageKind::Text || message.origin != MessageOrigin::Counterpart {
            return;
        }

        let Some(config) = self.conversations.get(&message.chat_key) else {
            tracing::debug!(
                conversation = %message.chat_key,
                "conversation not configured, history only"
            );
            return;
        };
        if !config.enabled {
            tracing::debug!(
                conversation = %message.chat_key,
                "auto-reply disabled, history only"
            );
            return;
        }

        self.deps
            .pending
            .enqueue(
                &message.chat_key,
                PendingMessage {
                    content: message.content,
                    handle: message.handle,
                },
            )
            .await;

        let mut actors = self.actors.lock().await;
        let handle = actors
            .entry(Arc::clone(&message.chat_key))
            .or_insert_with(|| {
                ConversationScheduler::spawn(
                    Arc::clone(&message.chat_key),
                    Arc::clone(config),
                    Arc::clone(&self.deps),
                    self.shutdown_rx.clone(),
                )
            });
        match handle.events.try_send(SchedulerEvent::Arrival) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                // A timer will be re-armed once the scheduler catches up on
                // its arrival backlog.
                tracing::warn!(conversation = %message.chat_key, "scheduler event queue full");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    conversation = %message.chat_key,
                    "scheduler stopped, message stays unanswered"
                );
            }
        }
    }

    /// Cancel all armed timers and stop the schedulers. Messages queued behind
    /// a cancelled timer are never flushed; an already-running flush completes.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send_replace(true) {
            return;
        }

        let handles: Vec<_> = self.actors.lock().await.drain().collect();
        for (key, handle) in handles {
            if let Err(error) = handle.task.await
                && !error.is_cancelled()
            {
                tracing::error!(
                    conversation = %key,
                    %error,
                    "conversation scheduler failed during shutdown"
                );
            }
        }
        tracing::info!("responder stopped");
    }
}
