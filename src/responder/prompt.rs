//! Generation request assembly.
//!
//! Pure functions of their inputs: the same batch, history, and style prompt
//! always produce the same request, with arrival order preserved throughout.

use crate::llm::{ChatTurn, GenerationRequest};
use crate::{HistoryEntry, MessageOrigin};

const SYSTEM_INSTRUCTION: &str = "\
You are answering chat messages on behalf of the account owner. Study the \
conversation transcript to learn their tone, typical message length, phrasing, \
and emoji habits, then reply exactly as they would. Keep replies short and \
natural for a chat thread. Never reveal that the reply is automated.";

/// Build the generation request for one flushed batch.
///
/// The system turn is the fixed instruction plus the per-conversation style
/// addendum, if any. The user turn renders the history transcript (oldest
/// first, labeled by origin) followed by the batch: verbatim for a single
/// message, numbered for a burst.
pub(crate) fn build(
    style_prompt: Option<&str>,
    batch: &[String],
    history: &[HistoryEntry],
) -> GenerationRequest {
    let system = match style_prompt {
        Some(style) => format!("{SYSTEM_INSTRUCTION}\n\n{style}"),
        None => SYSTEM_INSTRUCTION.to_string(),
    };

    let mut payload = String::new();
    if !history.is_empty() {
        payload.push_str("Conversation so far, oldest first:\n");
        for entry in history {
            let speaker = match entry.origin {
                MessageOrigin::Own => "Me",
                MessageOrigin::Counterpart => "Them",
            };
            payload.push_str(&format!("{speaker}: {}\n", entry.content));
        }
        payload.push('\n');
    }

    match batch {
        [single] => {
            payload.push_str("New message:\n");
            payload.push_str(single);
        }
        _ => {
            payload.push_str("New messages, oldest first:\n");
            for (index, message) in batch.iter().enumerate() {
                payload.push_str(&format!("{}. {message}\n", index + 1));
            }
            payload.push_str("\nWrite one reply that covers all of them.");
        }
    }

    GenerationRequest {
        turns: vec![ChatTurn::system(system), ChatTurn::user(payload)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn single_message_is_embedded_verbatim() {
        let request = build(None, &["hi there".to_string()], &[]);

        assert_eq!(request.turns.len(), 2);
        assert_eq!(request.turns[0].role, Role::System);
        assert_eq!(request.turns[1].role, Role::User);
        assert!(request.turns[1].content.contains("New message:\nhi there"));
        assert!(!request.turns[1].content.contains("1."));
    }

    #[test]
    fn burst_is_numbered_in_arrival_order() {
        let batch = vec!["hi".to_string(), "u there?".to_string()];
        let request = build(None, &batch, &[]);

        let user = &request.turns[1].content;
        assert!(user.contains("1. hi\n2. u there?"));
        assert!(user.contains("one reply"));
    }

    #[test]
    fn history_is_rendered_oldest_first_with_origin_labels() {
        let history = vec![
            HistoryEntry::new("how's it going", MessageOrigin::Counterpart),
            HistoryEntry::new("pretty good!", MessageOrigin::Own),
        ];
        let request = build(None, &["cool".to_string()], &history);

        let user = &request.turns[1].content;
        let counterpart_at = user
            .find("Them: how's it going")
            .expect("counterpart line should be rendered");
        let own_at = user
            .find("Me: pretty good!")
            .expect("own line should be rendered");
        assert!(counterpart_at < own_at, "history order must be preserved");
    }

    #[test]
    fn empty_history_omits_transcript_section() {
        let request = build(None, &["hi".to_string()], &[]);
        assert!(!request.turns[1].content.contains("Conversation so far"));
    }

    #[test]
    fn style_prompt_extends_system_turn() {
        let request = build(Some("Reply in French."), &["hi".to_string()], &[]);
        let system = &request.turns[0].content;
        assert!(system.starts_with("You are answering chat messages"));
        assert!(system.ends_with("Reply in French."));
    }

    #[test]
    fn build_is_deterministic() {
        let history = vec![HistoryEntry::new("yo", MessageOrigin::Counterpart)];
        let batch = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            build(Some("style"), &batch, &history),
            build(Some("style"), &batch, &history),
        );
    }
}
