//! Batch flush orchestration: the single path invoked when a debounce timer
//! fires.

use super::{ResponderDeps, prompt};
use crate::config::ConversationConfig;
use crate::{ConversationKey, MessageOrigin};

/// Drain the conversation's pending queue and produce one reply for it.
///
/// A failed generation call substitutes the configured fallback text and the
/// flush proceeds; any other failure propagates to the scheduler boundary
/// where it is logged and swallowed so one conversation's fault never affects
/// another.
pub(crate) async fn flush_conversation(
    deps: &ResponderDeps,
    key: &ConversationKey,
    config: &ConversationConfig,
) -> crate::error::Result<()> {
    let batch = deps.pending.drain_and_clear(key).await;
    // A timer can fire for a queue another path already drained. Benign race,
    // nothing to do.
    let Some(reply_target) = batch.last().map(|message| message.handle.clone()) else {
        tracing::debug!(conversation = %key, "flush fired with empty queue");
        return Ok(());
    };

    let contents: Vec<String> = batch.into_iter().map(|message| message.content).collect();
    tracing::info!(
        conversation = %key,
        batch_size = contents.len(),
        "flushing reply batch"
    );

    let history = deps.history.recent(key, deps.history_window).await;
    let request = prompt::build(config.style_prompt.as_deref(), &contents, &history);

    let reply = match deps.generator.generate(&request).await {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(
                conversation = %key,
                %error,
                "generation failed, sending fallback reply"
            );
            deps.fallback_reply.clone()
        }
    };

    // Natural-delay policy: never reply the instant the window closes. Runs on
    // the flush task, so other conversations are unaffected.
    let delay = deps.reply_delay.sample();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    deps.sender.send(&reply_target, &reply).await?;

    deps.history.append(key, &reply, MessageOrigin::Own).await;
    deps.transcript.record_reply(key, &reply);

    Ok(())
}
