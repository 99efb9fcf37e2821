/// Completion client trait and shared types for talking to the model.
///
/// The pipeline only sees [`CompletionClient`]; the Anthropic implementation
/// and the scripted test double both live behind it.
pub mod anthropic;
pub mod mock;
pub mod rate_limit;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while requesting a completion.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not set: export {0}")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("rate limited after {0} attempts")]
    RateLimited(u32),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Trait for text completion backends.
///
/// Implementations must be `Send + Sync` so a single client can be shared
/// behind `Arc` by the CLI and the MCP server.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one prompt and return the model's raw text reply.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs and reports.
    fn model(&self) -> &str;
}
