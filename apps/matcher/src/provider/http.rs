use async_trait::async_trait;
use serde_json::Value;

use crate::llm_client::prompts::extraction_prompts;
use crate::llm_client::LlmClient;
use crate::models::Embedding;
use crate::provider::{AiProvider, ProviderError};

/// Real provider: embeddings and schema-guided extraction over HTTP.
pub struct HttpAiProvider(pub LlmClient);

#[async_trait]
impl AiProvider for HttpAiProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn generate_embedding(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.0.embed(text).await
    }

    async fn extract_structured_data(
        &self,
        text: &str,
        schema: &Value,
    ) -> Result<Value, ProviderError> {
        let (system, template) = extraction_prompts(schema);
        let prompt = template.replace("{text}", text);
        self.0.call_json::<Value>(&prompt, system, schema).await
    }
}
