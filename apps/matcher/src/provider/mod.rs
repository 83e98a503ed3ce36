//! Embedding/extraction provider: the capability interface the engine consumes.
//!
//! Two strategies, chosen once at construction:
//! - `StubEmbeddingProvider`: deterministic, offline, used by tests and dry runs.
//! - `HttpAiProvider`: the real provider behind `LlmClient`.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::Embedding;

pub mod http;
pub mod stub;

pub use http::HttpAiProvider;
pub use stub::StubEmbeddingProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider is not configured")]
    Unavailable,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Provider returned empty content")]
    EmptyContent,
}

/// Capabilities the matcher needs from an AI backend.
///
/// Passed around as `Arc<dyn AiProvider>`; every failure is a `ProviderError`
/// for the caller to map onto a fallback or skip.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Short label for logs and build details.
    fn name(&self) -> &'static str;

    async fn generate_embedding(&self, text: &str) -> Result<Embedding, ProviderError>;

    async fn extract_structured_data(
        &self,
        text: &str,
        schema: &Value,
    ) -> Result<Value, ProviderError>;
}
