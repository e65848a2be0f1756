//! Documentation text generation.
//!
//! The generator is an opaque text service: a prompt goes in, documentation
//! text comes out. [`OpenAiGenerator`] talks to any OpenAI-compatible
//! chat-completions endpoint.

mod openai;
mod prompt;

pub use openai::OpenAiGenerator;
pub use prompt::{build_prompt, clean_response, SYSTEM_PROMPT};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while generating documentation.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by generation service")]
    RateLimited,
    #[error("generation service returned HTTP {0}")]
    Status(u16),
    #[error("generation service returned no text")]
    EmptyResponse,
    #[error("generator not configured: {0}")]
    NotConfigured(String),
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}
