//! Two-stage matching run: Stage-1 candidate retrieval, then Stage-2
//! requirement matching for each candidate in ranked order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{MatcherConfig, PreferenceWeights};
use crate::errors::MatchError;
use crate::index::MatchIndex;
use crate::matching::coverage::summarize_coverage;
use crate::matching::preferences::PreferenceMatcher;
use crate::matching::requirements::RequirementMatcher;
use crate::matching::similarity::clamp_similarity;
use crate::models::matching::JobMatchPreliminary;
use crate::models::preferences::UserPreferences;
use crate::profiling::ResumeProfiling;

/// Cooperative cancellation shared between a run and whoever may stop it.
///
/// Checked once per candidate; a candidate already in Stage-2 finishes.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct MatcherService {
    index: Arc<dyn MatchIndex>,
    config: MatcherConfig,
    requirement_matcher: RequirementMatcher,
    preference_matcher: PreferenceMatcher,
}

impl MatcherService {
    pub fn new(
        index: Arc<dyn MatchIndex>,
        config: MatcherConfig,
        preference_weights: PreferenceWeights,
    ) -> Self {
        let requirement_matcher = RequirementMatcher::new(index.clone(), &config);
        Self {
            index,
            config,
            requirement_matcher,
            preference_matcher: PreferenceMatcher::new(preference_weights),
        }
    }

    /// Runs both stages for a profiled resume.
    ///
    /// - No evidence units: empty result.
    /// - No stored Stage-1 embedding for the fingerprint: `NotFound`.
    /// - No candidates: empty result.
    /// - Cancelled: whatever was assembled so far.
    ///
    /// Results are sorted by Stage-1 similarity, highest first.
    pub async fn match_resume_two_stage(
        &self,
        profiling: &ResumeProfiling,
        preferences: Option<&UserPreferences>,
        tenant_id: Option<Uuid>,
        cancel: Option<&CancellationFlag>,
    ) -> Result<Vec<JobMatchPreliminary>, MatchError> {
        if profiling.evidence_units.is_empty() {
            warn!("No evidence units extracted from resume");
            return Ok(Vec::new());
        }
        let fingerprint = profiling.fingerprint.as_str();

        let resume_embedding = self
            .index
            .get_resume_summary_embedding(fingerprint)
            .await?
            .ok_or_else(|| {
                MatchError::NotFound(format!(
                    "Stage-1 embedding for resume {fingerprint}; run profiling and embedding first"
                ))
            })?;

        let candidates = self
            .index
            .get_top_jobs_by_summary_embedding(&resume_embedding, self.config.batch_size, tenant_id)
            .await?;
        if candidates.is_empty() {
            warn!("No matching candidates found in Stage 1");
            return Ok(Vec::new());
        }
        info!("Stage 1: retrieved {} candidates", candidates.len());

        let calculated_total = profiling.profile.calculated_total_years;
        let mut results = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if cancel.is_some_and(CancellationFlag::is_cancelled) {
                info!(
                    "Matching cancelled after {} candidates; returning partial results",
                    results.len()
                );
                break;
            }

            let partition = self
                .requirement_matcher
                .match_requirements(&candidate.job.requirements, fingerprint)
                .await?;
            let coverage = summarize_coverage(&partition, calculated_total);
            let preferences_alignment = self
                .preference_matcher
                .calculate_alignment(&candidate.job, preferences);

            debug!(
                "Job {}: similarity={:.3}, matched={}, missing={}",
                candidate.job.id,
                candidate.similarity,
                partition.matched.len(),
                partition.missing.len()
            );

            results.push(JobMatchPreliminary {
                job: candidate.job,
                job_similarity: clamp_similarity(candidate.similarity),
                preferences_alignment,
                requirement_matches: partition.matched,
                missing_requirements: partition.missing,
                coverage,
                resume_fingerprint: fingerprint.to_string(),
            });
        }

        results.sort_by(|a, b| b.job_similarity.total_cmp(&a.job_similarity));
        info!("Stage 2: assembled {} preliminary matches", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryIndex;
    use crate::models::evidence::EvidenceUnit;
    use crate::models::job::{CandidateJob, JobPost, JobRequirement, RequirementType};
    use crate::models::resume::ResumeProfile;

    fn profiling(units: Vec<EvidenceUnit>) -> ResumeProfiling {
        ResumeProfiling {
            fingerprint: "fp".to_string(),
            profile: ResumeProfile::default(),
            evidence_units: units,
        }
    }

    fn candidate(title: &str, summary: Vec<f32>, requirements: Vec<JobRequirement>) -> CandidateJob {
        CandidateJob {
            job: JobPost {
                id: Uuid::new_v4(),
                title: title.to_string(),
                company: "Acme".to_string(),
                location_text: None,
                is_remote: true,
                company_num_employees: None,
                company_industry: None,
                job_level: None,
                requirements,
            },
            summary_embedding: Some(summary),
        }
    }

    fn requirement(id: &str, embedding: Vec<f32>) -> JobRequirement {
        JobRequirement {
            id: id.to_string(),
            req_type: RequirementType::Required,
            text: id.to_string(),
            embedding: Some(embedding),
            min_years: None,
            years_context: None,
        }
    }

    async fn seeded_index() -> Arc<InMemoryIndex> {
        let index = Arc::new(InMemoryIndex::new());
        index
            .save_evidence_units(
                "fp",
                &[EvidenceUnit::new("reu_0", "Rust services", "Experience").with_embedding(vec![1.0, 0.0])],
            )
            .await
            .unwrap();
        index
            .save_resume_summary_embedding("fp", &[1.0, 0.0], &serde_json::json!({}))
            .await
            .unwrap();
        index
            .add_job(
                candidate("second", vec![0.6, 0.8], vec![requirement("a", vec![0.0, 1.0])]),
                None,
            )
            .await;
        index
            .add_job(
                candidate("first", vec![1.0, 0.0], vec![requirement("b", vec![1.0, 0.0])]),
                None,
            )
            .await;
        index
    }

    fn service(index: Arc<InMemoryIndex>, batch_size: usize) -> MatcherService {
        MatcherService::new(
            index,
            MatcherConfig {
                batch_size,
                ..MatcherConfig::default()
            },
            PreferenceWeights::default(),
        )
    }

    fn units() -> Vec<EvidenceUnit> {
        vec![EvidenceUnit::new("reu_0", "Rust services", "Experience")]
    }

    #[tokio::test]
    async fn test_no_evidence_returns_empty() {
        let svc = service(Arc::new(InMemoryIndex::new()), 10);
        let results = svc
            .match_resume_two_stage(&profiling(vec![]), None, None, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_missing_stage1_embedding_is_not_found() {
        let svc = service(Arc::new(InMemoryIndex::new()), 10);
        let err = svc
            .match_resume_two_stage(&profiling(units()), None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_no_candidates_returns_empty() {
        let index = Arc::new(InMemoryIndex::new());
        index
            .save_resume_summary_embedding("fp", &[1.0, 0.0], &serde_json::json!({}))
            .await
            .unwrap();
        let results = service(index, 10)
            .match_resume_two_stage(&profiling(units()), None, None, None)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_ranked_by_stage1_similarity() {
        let svc = service(seeded_index().await, 10);
        let results = svc
            .match_resume_two_stage(&profiling(units()), None, None, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].job.title, "first");
        assert!(results[0].job_similarity >= results[1].job_similarity);
        assert_eq!(results[0].requirement_matches.len(), 1);
        assert_eq!(results[0].coverage.required_coverage, 1.0);
        // orthogonal requirement: similarity 0.5, below 0.65
        assert_eq!(results[1].missing_requirements.len(), 1);
        assert!(results[1].missing_requirements[0].evidence.is_some());
        assert!(results.iter().all(|r| r.resume_fingerprint == "fp"));
        assert!(results.iter().all(|r| r.preferences_alignment.is_none()));
    }

    #[tokio::test]
    async fn test_non_finite_summary_scores_zero_and_ranks_last() {
        let index = seeded_index().await;
        index
            .add_job(candidate("broken", vec![f32::NAN, 0.0], vec![]), None)
            .await;

        let results = service(index, 10)
            .match_resume_two_stage(&profiling(units()), None, None, None)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let last = results.last().unwrap();
        assert_eq!(last.job.title, "broken");
        assert_eq!(last.job_similarity, 0.0);
        assert!(results
            .iter()
            .all(|r| (0.0..=1.0).contains(&r.job_similarity)));
    }

    #[tokio::test]
    async fn test_batch_size_limits_candidates() {
        let svc = service(seeded_index().await, 1);
        let results = svc
            .match_resume_two_stage(&profiling(units()), None, None, None)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].job.title, "first");
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_partial_results() {
        let svc = service(seeded_index().await, 10);
        let flag = CancellationFlag::new();
        flag.cancel();
        let results = svc
            .match_resume_two_stage(&profiling(units()), None, None, Some(&flag))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_preferences_scored_when_supplied() {
        let svc = service(seeded_index().await, 10);
        let mut prefs = UserPreferences::default();
        prefs.career_preferences.role_types = vec!["first".to_string()];

        let results = svc
            .match_resume_two_stage(&profiling(units()), Some(&prefs), None, None)
            .await
            .unwrap();
        let alignment = results[0].preferences_alignment.as_ref().unwrap();
        assert_eq!(alignment.role, 1.0);
        assert_eq!(alignment.location, 1.0);
    }

    #[test]
    fn test_cancellation_flag_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}
