//! Nearest-neighbour lookups over evidence units and job summaries.
//!
//! Two strategies:
//! - `InMemoryIndex`: brute-force search, used by tests and offline runs.
//! - `PgMatchIndex`: Postgres + pgvector.
//!
//! Both report similarity as `clamp(1 - d/2, 0, 1)` over cosine distance `d`.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::MatchError;
use crate::models::evidence::EvidenceUnit;
use crate::models::job::JobPost;
use crate::models::Embedding;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryIndex;
pub use postgres::PgMatchIndex;

/// One evidence unit returned for a requirement, with its similarity in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceHit {
    pub evidence: EvidenceUnit,
    pub similarity: f64,
}

/// One candidate job returned for a resume vector, with its similarity in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct JobHit {
    pub job: JobPost,
    pub similarity: f64,
}

#[async_trait]
pub trait MatchIndex: Send + Sync {
    /// Best evidence units of one resume for a requirement vector,
    /// sorted by similarity descending, at most `top_k` long.
    async fn find_best_evidence_for_requirement(
        &self,
        requirement_embedding: &[f32],
        resume_fingerprint: &str,
        top_k: usize,
    ) -> Result<Vec<EvidenceHit>, MatchError>;

    /// Jobs ranked by similarity between their summary embedding and the
    /// resume vector, at most `limit` long.
    async fn get_top_jobs_by_summary_embedding(
        &self,
        resume_embedding: &[f32],
        limit: usize,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<JobHit>, MatchError>;

    async fn get_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
    ) -> Result<Option<Embedding>, MatchError>;

    /// Replaces every stored evidence unit for the fingerprint.
    async fn save_evidence_units(
        &self,
        resume_fingerprint: &str,
        units: &[EvidenceUnit],
    ) -> Result<(), MatchError>;

    async fn save_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
        embedding: &[f32],
        details: &Value,
    ) -> Result<(), MatchError>;
}
