//! TOML configuration for the responder daemon.
//!
//! Loaded once at startup and treated as immutable afterwards. Per-conversation
//! settings are looked up by nickname; a conversation absent from the file (or
//! present with `enabled = false`) is logged and history-tracked but never
//! replied to.

use crate::ConversationKey;
use anyhow::Context as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// How many past entries feed the generation context. The in-memory
    /// history retains twice this many entries per conversation.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Append-only transcript log file.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Reply text used when the generation call fails.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    pub llm: LlmConfig,

    #[serde(default)]
    pub reply_delay: ReplyDelayConfig,

    #[serde(default)]
    pub conversations: Vec<ConversationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Override for the chat-completions endpoint. Defaults to the OpenAI API.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Randomized wait applied between generating a reply and sending it, so
/// replies don't land with mechanical timing.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReplyDelayConfig {
    #[serde(default = "default_delay_min")]
    pub min_secs: f64,
    #[serde(default = "default_delay_max")]
    pub max_secs: f64,
}

impl Default for ReplyDelayConfig {
    fn default() -> Self {
        Self {
            min_secs: default_delay_min(),
            max_secs: default_delay_max(),
        }
    }
}

impl ReplyDelayConfig {
    /// Draw a delay from the configured range.
    pub fn sample(&self) -> Duration {
        use rand::Rng as _;
        let secs = if self.max_secs > self.min_secs {
            rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::from_secs_f64(secs.max(0.0))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// The conversation key as the chat binding reports it.
    pub nickname: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quiet period after the last message in a burst before a reply is
    /// produced.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// Optional addendum to the system instruction for this conversation.
    #[serde(default)]
    pub style_prompt: Option<String>,
}

impl ConversationConfig {
    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

impl Config {
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        anyhow::ensure!(self.history_window > 0, "history_window must be at least 1");
        anyhow::ensure!(
            self.reply_delay.min_secs >= 0.0
                && self.reply_delay.max_secs >= self.reply_delay.min_secs,
            "reply_delay range is invalid: min_secs={} max_secs={}",
            self.reply_delay.min_secs,
            self.reply_delay.max_secs,
        );

        let mut seen = std::collections::HashSet::new();
        for conversation in &self.conversations {
            anyhow::ensure!(
                seen.insert(conversation.nickname.as_str()),
                "duplicate conversation nickname in config: {}",
                conversation.nickname,
            );
        }
        Ok(())
    }

    /// Index the per-conversation settings by key for lookup on the intake path.
    pub fn conversation_map(&self) -> HashMap<ConversationKey, Arc<ConversationConfig>> {
        self.conversations
            .iter()
            .map(|conversation| {
                (
                    ConversationKey::from(conversation.nickname.as_str()),
                    Arc::new(conversation.clone()),
                )
            })
            .collect()
    }
}

fn default_history_window() -> usize {
    20
}

fn default_log_file() -> PathBuf {
    PathBuf::from("message_log.txt")
}

fn default_fallback_reply() -> String {
    "收到".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    150
}

fn default_delay_min() -> f64 {
    1.0
}

fn default_delay_max() -> f64 {
    3.0
}

fn default_true() -> bool {
    true
}

fn default_wait_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [llm]
            api_key = "sk-test"

            [[conversations]]
            nickname = "Alice"
            "#,
        )
        .expect("minimal config should parse");

        assert_eq!(config.history_window, 20);
        assert_eq!(config.fallback_reply, "收到");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.reply_delay.min_secs, 1.0);
        assert_eq!(config.reply_delay.max_secs, 3.0);

        let conversation = &config.conversations[0];
        assert!(conversation.enabled);
        assert_eq!(conversation.wait_secs, 5);
        assert!(conversation.style_prompt.is_none());
    }

    #[test]
    fn rejects_duplicate_nicknames() {
        let config: Config = toml::from_str(
            r#"
            [llm]
            api_key = "sk-test"

            [[conversations]]
            nickname = "Alice"

            [[conversations]]
            nickname = "Alice"
            "#,
        )
        .expect("config should parse before validation");

        let error = config.validate().expect_err("duplicate nickname should fail");
        assert!(error.to_string().contains("duplicate conversation nickname"));
    }

    #[test]
    fn rejects_inverted_delay_range() {
        let config: Config = toml::from_str(
            r#"
            [llm]
            api_key = "sk-test"

            [reply_delay]
            min_secs = 5.0
            max_secs = 1.0
            "#,
        )
        .expect("config should parse before validation");

        assert!(config.validate().is_err());
    }

    #[test]
    fn delay_sample_stays_in_range() {
        let delay = ReplyDelayConfig {
            min_secs: 1.0,
            max_secs: 3.0,
        };
        for _ in 0..100 {
            let sampled = delay.sample();
            assert!(sampled >= Duration::from_secs(1));
            assert!(sampled <= Duration::from_secs(3));
        }

        let fixed = ReplyDelayConfig {
            min_secs: 0.0,
            max_secs: 0.0,
        };
        assert_eq!(fixed.sample(), Duration::ZERO);
    }
}
