//! OpenAI-compatible chat-completions client.

use super::{ChatTurn, GenerationRequest, Generator};
use crate::config::LlmConfig;
use crate::error::{LlmError, Result};
use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiGenerator {
    config: LlmConfig,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey.into());
        }

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = CompletionBody {
            model: &self.config.model,
            messages: &request.turns,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .http_client
            .post(self.base_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Request)?
            .error_for_status()
            .map_err(LlmError::Request)?;

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|error| LlmError::MalformedResponse(error.to_string()))?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::MalformedResponse("response contained no choices".into()))?;

        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn completion_body_serializes_expected_shape() {
        let turns = vec![ChatTurn::system("instructions"), ChatTurn::user("hi")];
        let body = CompletionBody {
            model: "gpt-4o-mini",
            messages: &turns,
            temperature: 0.8,
            max_tokens: 150,
        };

        let value = serde_json::to_value(&body).expect("body should serialize");
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "hi");
    }

    #[test]
    fn completion_response_parses_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":" hello "}}]}"#;
        let parsed: CompletionResponse =
            serde_json::from_str(raw).expect("response should parse");
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some(" hello ")
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = LlmConfig {
            api_key: String::new(),
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            max_tokens: 150,
            base_url: None,
        };
        assert!(OpenAiGenerator::new(config).is_err());
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(
            serde_json::to_value(Role::Assistant).expect("role should serialize"),
            "assistant"
        );
    }
}
