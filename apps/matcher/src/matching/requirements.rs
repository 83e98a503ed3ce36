//! Stage-2: one nearest-neighbour lookup per requirement.

use std::sync::Arc;

use tracing::debug;

use crate::config::MatcherConfig;
use crate::errors::MatchError;
use crate::index::MatchIndex;
use crate::matching::similarity::clamp_similarity;
use crate::models::job::JobRequirement;
use crate::models::matching::RequirementMatchResult;

/// Requirements split by coverage. Together they hold every input requirement
/// exactly once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementPartition {
    pub matched: Vec<RequirementMatchResult>,
    pub missing: Vec<RequirementMatchResult>,
}

impl RequirementPartition {
    pub fn len(&self) -> usize {
        self.matched.len() + self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RequirementMatcher {
    index: Arc<dyn MatchIndex>,
    similarity_threshold: f64,
    top_k: usize,
}

impl RequirementMatcher {
    pub fn new(index: Arc<dyn MatchIndex>, config: &MatcherConfig) -> Self {
        Self {
            index,
            similarity_threshold: config.similarity_threshold,
            top_k: config.top_k.max(1),
        }
    }

    /// Matches each requirement against the resume's best evidence unit.
    ///
    /// Covered means `similarity >= threshold`. A missing requirement keeps
    /// its best evidence, if any was found, for explanation.
    pub async fn match_requirements(
        &self,
        requirements: &[JobRequirement],
        resume_fingerprint: &str,
    ) -> Result<RequirementPartition, MatchError> {
        let mut partition = RequirementPartition::default();

        for requirement in requirements {
            let Some(embedding) = requirement.embedding.as_deref() else {
                debug!("Requirement {}: no embedding, marking as missing", requirement.id);
                partition.missing.push(uncovered(requirement));
                continue;
            };

            let hits = self
                .index
                .find_best_evidence_for_requirement(embedding, resume_fingerprint, self.top_k)
                .await?;

            let Some(best) = hits.into_iter().next() else {
                debug!("Requirement {}: no evidence found, marking as missing", requirement.id);
                partition.missing.push(uncovered(requirement));
                continue;
            };

            let similarity = clamp_similarity(best.similarity);
            let is_covered = similarity >= self.similarity_threshold;
            debug!(
                "Requirement {}: similarity={:.3}, threshold={:.3}, covered={}",
                requirement.id, similarity, self.similarity_threshold, is_covered
            );

            let result = RequirementMatchResult {
                requirement: requirement.clone(),
                evidence: Some(best.evidence),
                similarity,
                is_covered,
            };
            if is_covered {
                partition.matched.push(result);
            } else {
                partition.missing.push(result);
            }
        }

        debug!(
            "Matched {}/{} requirements (threshold={:.3})",
            partition.matched.len(),
            requirements.len(),
            self.similarity_threshold
        );
        Ok(partition)
    }
}

fn uncovered(requirement: &JobRequirement) -> RequirementMatchResult {
    RequirementMatchResult {
        requirement: requirement.clone(),
        evidence: None,
        similarity: 0.0,
        is_covered: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{EvidenceHit, JobHit};
    use crate::models::evidence::EvidenceUnit;
    use crate::models::job::RequirementType;
    use crate::models::Embedding;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Answers every lookup with a fixed similarity keyed by the first
    /// component of the requirement vector, and counts lookups.
    struct ScriptedIndex {
        lookups: AtomicUsize,
    }

    impl ScriptedIndex {
        fn new() -> Self {
            Self {
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MatchIndex for ScriptedIndex {
        async fn find_best_evidence_for_requirement(
            &self,
            requirement_embedding: &[f32],
            _resume_fingerprint: &str,
            top_k: usize,
        ) -> Result<Vec<EvidenceHit>, MatchError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            assert_eq!(top_k, 1);
            let key = requirement_embedding[0];
            if key < 0.0 {
                return Ok(Vec::new());
            }
            Ok(vec![EvidenceHit {
                evidence: EvidenceUnit::new("reu_7", "Built Kafka pipelines", "Experience"),
                similarity: key as f64,
            }])
        }

        async fn get_top_jobs_by_summary_embedding(
            &self,
            _resume_embedding: &[f32],
            _limit: usize,
            _tenant_id: Option<Uuid>,
        ) -> Result<Vec<JobHit>, MatchError> {
            Ok(Vec::new())
        }

        async fn get_resume_summary_embedding(
            &self,
            _resume_fingerprint: &str,
        ) -> Result<Option<Embedding>, MatchError> {
            Ok(None)
        }

        async fn save_evidence_units(
            &self,
            _resume_fingerprint: &str,
            _units: &[EvidenceUnit],
        ) -> Result<(), MatchError> {
            Ok(())
        }

        async fn save_resume_summary_embedding(
            &self,
            _resume_fingerprint: &str,
            _embedding: &[f32],
            _details: &Value,
        ) -> Result<(), MatchError> {
            Ok(())
        }
    }

    fn requirement(id: &str, embedding: Option<Vec<f32>>) -> JobRequirement {
        JobRequirement {
            id: id.to_string(),
            req_type: RequirementType::Required,
            text: format!("requirement {id}"),
            embedding,
            min_years: None,
            years_context: None,
        }
    }

    fn matcher(index: Arc<ScriptedIndex>, threshold: f64) -> RequirementMatcher {
        RequirementMatcher::new(
            index,
            &MatcherConfig {
                similarity_threshold: threshold,
                ..MatcherConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_requirement_without_embedding_skips_lookup() {
        let index = Arc::new(ScriptedIndex::new());
        let partition = matcher(index.clone(), 0.65)
            .match_requirements(&[requirement("r1", None)], "fp")
            .await
            .unwrap();

        assert!(partition.matched.is_empty());
        assert_eq!(partition.missing.len(), 1);
        assert_eq!(partition.missing[0].similarity, 0.0);
        assert!(partition.missing[0].evidence.is_none());
        assert_eq!(index.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_threshold_tie_counts_as_covered() {
        let index = Arc::new(ScriptedIndex::new());
        // 0.75 is exact in both f32 and f64
        let partition = matcher(index, 0.75)
            .match_requirements(&[requirement("r1", Some(vec![0.75]))], "fp")
            .await
            .unwrap();

        assert_eq!(partition.matched.len(), 1);
        assert!(partition.matched[0].is_covered);
    }

    #[tokio::test]
    async fn test_below_threshold_keeps_evidence() {
        let index = Arc::new(ScriptedIndex::new());
        let partition = matcher(index, 0.65)
            .match_requirements(&[requirement("r1", Some(vec![0.5]))], "fp")
            .await
            .unwrap();

        let missing = &partition.missing[0];
        assert!(!missing.is_covered);
        assert_eq!(missing.similarity, 0.5);
        assert_eq!(missing.evidence.as_ref().map(|e| e.id.as_str()), Some("reu_7"));
    }

    #[tokio::test]
    async fn test_nan_similarity_from_index_is_uncovered_zero() {
        let index = Arc::new(ScriptedIndex::new());
        let partition = matcher(index, 0.65)
            .match_requirements(&[requirement("r1", Some(vec![f32::NAN]))], "fp")
            .await
            .unwrap();

        let missing = &partition.missing[0];
        assert!(!missing.is_covered);
        assert_eq!(missing.similarity, 0.0);
        assert!(missing.evidence.is_some());
    }

    #[tokio::test]
    async fn test_empty_lookup_is_missing_without_evidence() {
        let index = Arc::new(ScriptedIndex::new());
        let partition = matcher(index, 0.65)
            .match_requirements(&[requirement("r1", Some(vec![-1.0]))], "fp")
            .await
            .unwrap();

        assert_eq!(partition.missing.len(), 1);
        assert!(partition.missing[0].evidence.is_none());
        assert_eq!(partition.missing[0].similarity, 0.0);
    }

    #[tokio::test]
    async fn test_partition_covers_every_requirement() {
        let index = Arc::new(ScriptedIndex::new());
        let requirements = vec![
            requirement("r1", Some(vec![0.9])),
            requirement("r2", None),
            requirement("r3", Some(vec![0.3])),
            requirement("r4", Some(vec![-1.0])),
            requirement("r5", Some(vec![0.65])),
        ];
        let partition = matcher(index.clone(), 0.65)
            .match_requirements(&requirements, "fp")
            .await
            .unwrap();

        assert_eq!(partition.len(), requirements.len());
        assert_eq!(index.lookups.load(Ordering::SeqCst), 4);
        let mut ids: Vec<&str> = partition
            .matched
            .iter()
            .chain(&partition.missing)
            .map(|r| r.requirement.id.as_str())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["r1", "r2", "r3", "r4", "r5"]);
    }
}
