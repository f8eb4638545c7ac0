//! Per-conversation debounce scheduler.
//!
//! Each configured conversation gets one actor task owning its timer state:
//! `Idle → Armed → (Armed | Firing) → Idle`. Arrivals re-arm the timer for
//! the full wait duration, so it always fires after the *last* message of a
//! burst. Flushes run on a spawned task; a deadline that expires while a
//! flush is still in flight is deferred until it completes (unless a newer
//! arrival re-arms the timer first), keeping at most one flush in flight per
//! conversation without stalling intake.

use super::{ResponderDeps, dispatch};
use crate::ConversationKey;
use crate::config::ConversationConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

const EVENT_QUEUE_DEPTH: usize = 64;
/// Sleep used when no timer is armed; the select loop wakes on events anyway.
const IDLE_SLEEP: Duration = Duration::from_secs(3600);

#[derive(Debug)]
pub(crate) enum SchedulerEvent {
    /// A new pending message was enqueued for this conversation.
    Arrival,
}

pub(crate) struct SchedulerHandle {
    pub(crate) events: mpsc::Sender<SchedulerEvent>,
    pub(crate) task: JoinHandle<()>,
}

pub(crate) struct ConversationScheduler {
    key: ConversationKey,
    config: Arc<ConversationConfig>,
    deps: Arc<ResponderDeps>,
    events: mpsc::Receiver<SchedulerEvent>,
    shutdown: watch::Receiver<bool>,
    deadline: Option<Instant>,
    in_flight: Option<JoinHandle<()>>,
    fire_deferred: bool,
}

impl ConversationScheduler {
    pub(crate) fn spawn(
        key: ConversationKey,
        config: Arc<ConversationConfig>,
        deps: Arc<ResponderDeps>,
        shutdown: watch::Receiver<bool>,
    ) -> SchedulerHandle {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let scheduler = Self {
            key,
            config,
            deps,
            events: event_rx,
            shutdown,
            deadline: None,
            in_flight: None,
            fire_deferred: false,
        };
        let task = tokio::spawn(scheduler.run());
        SchedulerHandle {
            events: event_tx,
            task,
        }
    }

    async fn run(mut self) {
        tracing::debug!(conversation = %self.key, "conversation scheduler started");

        loop {
            let flush_in_flight = self.in_flight.is_some();
            let sleep_duration = self
                .deadline
                .map(|deadline| {
                    let now = Instant::now();
                    if deadline > now {
                        deadline - now
                    } else {
                        Duration::from_millis(1)
                    }
                })
                .unwrap_or(IDLE_SLEEP);

            tokio::select! {
                event = self.events.recv() => match event {
                    Some(SchedulerEvent::Arrival) => {
                        // Cancel-and-replace: the quiet period restarts from
                        // the latest message. That supersedes a deferred fire
                        // too — the fresh deadline covers everything still
                        // queued, so the old one must not flush it early.
                        self.deadline = Some(Instant::now() + self.config.wait_duration());
                        self.fire_deferred = false;
                    }
                    None => break,
                },
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        if self.deadline.take().is_some() {
                            tracing::info!(
                                conversation = %self.key,
                                "shutdown cancelled an armed reply timer, queued messages are dropped"
                            );
                        }
                        break;
                    }
                }
                join = join_in_flight(&mut self.in_flight), if flush_in_flight => {
                    self.in_flight = None;
                    if let Err(error) = join
                        && !error.is_cancelled()
                    {
                        tracing::error!(conversation = %self.key, %error, "reply flush task failed");
                    }
                    if self.fire_deferred {
                        self.fire_deferred = false;
                        self.start_flush();
                    }
                }
                _ = tokio::time::sleep(sleep_duration), if self.deadline.is_some() => {
                    let now = Instant::now();
                    if self.deadline.is_some_and(|deadline| deadline <= now) {
                        self.deadline = None;
                        if self.in_flight.is_some() {
                            // The previous batch is still flushing. Fire this
                            // one when it completes so batches never
                            // interleave their ordering.
                            self.fire_deferred = true;
                        } else {
                            self.start_flush();
                        }
                    }
                }
            }
        }

        // A flush that already started runs to completion; only Armed timers
        // are cancelled by shutdown.
        if let Some(task) = self.in_flight.take()
            && let Err(error) = task.await
            && !error.is_cancelled()
        {
            tracing::error!(conversation = %self.key, %error, "reply flush task failed during shutdown");
        }

        tracing::debug!(conversation = %self.key, "conversation scheduler stopped");
    }

    fn start_flush(&mut self) {
        let deps = Arc::clone(&self.deps);
        let key = Arc::clone(&self.key);
        let config = Arc::clone(&self.config);
        self.in_flight = Some(tokio::spawn(async move {
            if let Err(error) = dispatch::flush_conversation(&deps, &key, &config).await {
                tracing::error!(conversation = %key, %error, "error flushing reply batch");
            }
        }));
    }
}

async fn join_in_flight(task: &mut Option<JoinHandle<()>>) -> Result<(), JoinError> {
    match task.as_mut() {
        Some(task) => task.await,
        // Unreachable while the select branch is guarded, but never busy-poll.
        None => std::future::pending().await,
    }
}
