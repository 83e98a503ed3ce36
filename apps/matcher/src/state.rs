use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::config::{Config, EmbeddingBackend, IndexBackend};
use crate::db::create_pool;
use crate::errors::MatchError;
use crate::index::{InMemoryIndex, MatchIndex, PgMatchIndex};
use crate::llm_client::LlmClient;
use crate::matching::stage1::ResumeEmbeddingBuilder;
use crate::matching::MatcherService;
use crate::models::resume::StructuredResume;
use crate::profiling::{ResumeProfiler, ResumeProfiling};
use crate::provider::{AiProvider, HttpAiProvider, StubEmbeddingProvider};

/// Dimension of stub vectors when `EMBEDDING_DIM` is not set.
const DEFAULT_STUB_DIMENSION: usize = 384;

/// Everything a matching run needs, built once and passed by reference.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    /// Embedding/extraction strategy, chosen by `EMBEDDING_BACKEND`.
    pub provider: Arc<dyn AiProvider>,
    /// Evidence/job index, chosen by `INDEX_BACKEND`.
    pub index: Arc<dyn MatchIndex>,
}

impl AppContext {
    pub fn new(config: Config, provider: Arc<dyn AiProvider>, index: Arc<dyn MatchIndex>) -> Self {
        Self {
            config,
            provider,
            index,
        }
    }

    /// Builds the provider and index the configuration asks for.
    pub async fn from_config(config: Config) -> Result<Self> {
        let provider: Arc<dyn AiProvider> = match config.embedding_backend {
            EmbeddingBackend::Stub => {
                let dimension = config.stage1.embedding_dim.unwrap_or(DEFAULT_STUB_DIMENSION);
                Arc::new(StubEmbeddingProvider::new(dimension))
            }
            EmbeddingBackend::Http => {
                let api_key = config
                    .embedding_api_key
                    .clone()
                    .context("EMBEDDING_API_KEY is required for the http embedding backend")?;
                let client = LlmClient::new(
                    config.embedding_api_url.clone(),
                    api_key,
                    config.embedding_model.clone(),
                    config.extraction_model.clone(),
                )?;
                Arc::new(HttpAiProvider(client))
            }
        };
        info!("Embedding provider initialized ({})", provider.name());

        let index: Arc<dyn MatchIndex> = match config.index_backend {
            IndexBackend::Memory => Arc::new(InMemoryIndex::new()),
            IndexBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required for the postgres index backend")?;
                Arc::new(PgMatchIndex::new(create_pool(url).await?))
            }
        };
        info!("Match index initialized ({:?})", config.index_backend);

        Ok(Self::new(config, provider, index))
    }

    pub fn profiler(&self) -> ResumeProfiler {
        ResumeProfiler::new(self.provider.clone())
    }

    pub fn stage1_builder(&self) -> ResumeEmbeddingBuilder {
        ResumeEmbeddingBuilder::new(self.config.stage1.clone(), Some(self.provider.clone()))
    }

    pub fn matcher_service(&self) -> MatcherService {
        MatcherService::new(
            self.index.clone(),
            self.config.matcher.clone(),
            self.config.preference_weights,
        )
    }

    /// Profiles the resume, stores its evidence units, then builds and stores
    /// the Stage-1 embedding. Returns the profiling and the Stage-1 details.
    pub async fn prepare_resume(
        &self,
        resume: &StructuredResume,
    ) -> Result<(ResumeProfiling, Value), MatchError> {
        let profiling = self.profiler().profile_resume(resume).await?;
        self.index
            .save_evidence_units(&profiling.fingerprint, &profiling.evidence_units)
            .await?;

        let (embedding, details) = self
            .stage1_builder()
            .build(&profiling.evidence_units)
            .await?;
        self.index
            .save_resume_summary_embedding(&profiling.fingerprint, &embedding, &details)
            .await?;

        info!(
            "Prepared resume {}: {} evidence units, Stage-1 mode {}",
            profiling.fingerprint,
            profiling.evidence_units.len(),
            details["actual_mode"]
        );
        Ok((profiling, details))
    }
}
