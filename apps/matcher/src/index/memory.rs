use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::errors::MatchError;
use crate::index::{EvidenceHit, JobHit, MatchIndex};
use crate::matching::similarity::{raw_cosine, similarity_from_distance};
use crate::models::evidence::EvidenceUnit;
use crate::models::job::CandidateJob;
use crate::models::Embedding;

struct StoredJob {
    candidate: CandidateJob,
    tenant_id: Option<Uuid>,
}

/// Brute-force index held in memory.
///
/// Distances are cosine distances `1 - cos`, converted back to similarity the
/// same way the database-backed index does.
#[derive(Default)]
pub struct InMemoryIndex {
    evidence: RwLock<HashMap<String, Vec<EvidenceUnit>>>,
    summaries: RwLock<HashMap<String, (Embedding, Value)>>,
    jobs: RwLock<Vec<StoredJob>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_job(&self, candidate: CandidateJob, tenant_id: Option<Uuid>) {
        self.jobs.write().await.push(StoredJob {
            candidate,
            tenant_id,
        });
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Build details stored next to a summary embedding, if any.
    pub async fn summary_details(&self, resume_fingerprint: &str) -> Option<Value> {
        self.summaries
            .read()
            .await
            .get(resume_fingerprint)
            .map(|(_, details)| details.clone())
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f64, MatchError> {
    Ok(1.0 - raw_cosine(a, b)?)
}

fn by_similarity_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[async_trait]
impl MatchIndex for InMemoryIndex {
    async fn find_best_evidence_for_requirement(
        &self,
        requirement_embedding: &[f32],
        resume_fingerprint: &str,
        top_k: usize,
    ) -> Result<Vec<EvidenceHit>, MatchError> {
        let evidence = self.evidence.read().await;
        let Some(units) = evidence.get(resume_fingerprint) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for unit in units {
            let Some(embedding) = unit.embedding.as_deref() else {
                continue;
            };
            let distance = cosine_distance(requirement_embedding, embedding)?;
            hits.push(EvidenceHit {
                evidence: unit.clone(),
                similarity: similarity_from_distance(distance),
            });
        }

        hits.sort_by(|a, b| by_similarity_desc(a.similarity, b.similarity));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn get_top_jobs_by_summary_embedding(
        &self,
        resume_embedding: &[f32],
        limit: usize,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<JobHit>, MatchError> {
        let jobs = self.jobs.read().await;

        let mut hits = Vec::new();
        for stored in jobs.iter() {
            if tenant_id.is_some() && stored.tenant_id != tenant_id {
                continue;
            }
            let Some(summary) = stored.candidate.summary_embedding.as_deref() else {
                continue;
            };
            let distance = cosine_distance(resume_embedding, summary)?;
            hits.push(JobHit {
                job: stored.candidate.job.clone(),
                similarity: similarity_from_distance(distance),
            });
        }

        hits.sort_by(|a, b| by_similarity_desc(a.similarity, b.similarity));
        hits.truncate(limit);
        debug!("In-memory Stage-1 lookup returned {} jobs", hits.len());
        Ok(hits)
    }

    async fn get_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
    ) -> Result<Option<Embedding>, MatchError> {
        Ok(self
            .summaries
            .read()
            .await
            .get(resume_fingerprint)
            .map(|(embedding, _)| embedding.clone()))
    }

    async fn save_evidence_units(
        &self,
        resume_fingerprint: &str,
        units: &[EvidenceUnit],
    ) -> Result<(), MatchError> {
        self.evidence
            .write()
            .await
            .insert(resume_fingerprint.to_string(), units.to_vec());
        Ok(())
    }

    async fn save_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
        embedding: &[f32],
        details: &Value,
    ) -> Result<(), MatchError> {
        self.summaries.write().await.insert(
            resume_fingerprint.to_string(),
            (embedding.to_vec(), details.clone()),
        );
        Ok(())
    }
}
