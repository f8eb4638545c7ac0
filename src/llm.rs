//! Text generation interface and clients.

pub mod openai;

pub use openai::OpenAiGenerator;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// An ordered generation request, ready for the completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub turns: Vec<ChatTurn>,
}

/// The external text-generation call: messages in, reply text out. Fallible
/// and latency-bearing; the dispatcher falls back once on failure and never
/// retries.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> crate::error::Result<String>;
}
