//! Error types shared across the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Failures from the text-generation collaborator.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("generation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("generation response was malformed: {0}")]
    MalformedResponse(String),

    #[error("no API key configured for the generation service")]
    MissingApiKey,
}
