use async_trait::async_trait;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::matching::similarity::l2_normalize;
use crate::matching::years::extract_from_text;
use crate::models::Embedding;
use crate::provider::{AiProvider, ProviderError};

/// Deterministic offline provider.
///
/// Embeddings are hashed bag-of-words vectors: each lowercase token adds ±1 to
/// one SHA-256-chosen dimension, then the vector is L2-normalised. Texts that
/// share words land close together, identical texts are identical vectors.
/// Structured extraction answers with the pattern-based years claim.
#[derive(Debug, Clone)]
pub struct StubEmbeddingProvider {
    dimension: usize,
}

impl StubEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0_f32; self.dimension];
        let lowered = text.to_lowercase();

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        l2_normalize(&vector)
    }
}

#[async_trait]
impl AiProvider for StubEmbeddingProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn generate_embedding(&self, text: &str) -> Result<Embedding, ProviderError> {
        Ok(self.embed_text(text))
    }

    async fn extract_structured_data(
        &self,
        text: &str,
        _schema: &Value,
    ) -> Result<Value, ProviderError> {
        let claim = extract_from_text(text);
        let claims = match claim.years {
            Some(years) => vec![json!({
                "years_value": years,
                "context": claim.context,
                "is_total_experience": claim.is_total_claim,
            })],
            None => vec![],
        };
        Ok(json!({ "years_claims": claims }))
    }
}
