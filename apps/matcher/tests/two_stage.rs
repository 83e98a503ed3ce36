//! End-to-end runs through the in-memory index and the stub provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use matcher::config::{Config, EmbeddingBackend, IndexBackend, MatcherConfig, PreferenceWeights, Stage1EmbeddingConfig};
use matcher::errors::MatchError;
use matcher::index::{EvidenceHit, InMemoryIndex, JobHit, MatchIndex};
use matcher::matching::explain::explain_match;
use matcher::matching::{CancellationFlag, MatcherService};
use matcher::models::evidence::EvidenceUnit;
use matcher::models::job::{CandidateJob, JobPost, JobRequirement, RequirementType};
use matcher::models::preferences::UserPreferences;
use matcher::models::resume::{ExperienceItem, ResumeSummary, SkillItem, StructuredResume};
use matcher::models::Embedding;
use matcher::provider::StubEmbeddingProvider;
use matcher::state::AppContext;

const DIM: usize = 128;

fn config() -> Config {
    Config {
        database_url: None,
        index_backend: IndexBackend::Memory,
        embedding_backend: EmbeddingBackend::Stub,
        embedding_api_url: "http://localhost".to_string(),
        embedding_api_key: None,
        embedding_model: "stub".to_string(),
        extraction_model: "stub".to_string(),
        matcher: MatcherConfig::default(),
        stage1: Stage1EmbeddingConfig {
            embedding_dim: Some(DIM),
            ..Stage1EmbeddingConfig::default()
        },
        preference_weights: PreferenceWeights::default(),
        rust_log: "debug".to_string(),
    }
}

fn resume() -> StructuredResume {
    StructuredResume {
        summary: ResumeSummary {
            text: Some("Rust backend engineer building payment systems".to_string()),
            total_experience_years: Some(5.0),
        },
        experience: vec![ExperienceItem {
            company: Some("Ledgerly".to_string()),
            title: Some("Backend Engineer".to_string()),
            start_date: Some("2020-01".to_string()),
            end_date: Some("2024-12".to_string()),
            is_current: false,
            description: Some("Built payment systems in Rust with Postgres".to_string()),
            tech_keywords: vec!["Rust".to_string(), "Postgres".to_string()],
        }],
        skills: vec![SkillItem {
            name: "Rust".to_string(),
            kind: None,
            proficiency: None,
            years_experience: None,
        }],
        ..StructuredResume::default()
    }
}

fn requirement(id: &str, req_type: RequirementType, text: &str, stub: &StubEmbeddingProvider) -> JobRequirement {
    JobRequirement {
        id: id.to_string(),
        req_type,
        text: text.to_string(),
        embedding: Some(stub.embed_text(text)),
        min_years: None,
        years_context: None,
    }
}

fn job(title: &str, summary: &str, requirements: Vec<JobRequirement>, stub: &StubEmbeddingProvider) -> CandidateJob {
    CandidateJob {
        job: JobPost {
            id: Uuid::new_v4(),
            title: title.to_string(),
            company: "Acme".to_string(),
            location_text: Some("Berlin".to_string()),
            is_remote: false,
            company_num_employees: Some("120".to_string()),
            company_industry: Some("Fintech".to_string()),
            job_level: Some("Senior".to_string()),
            requirements,
        },
        summary_embedding: Some(stub.embed_text(summary)),
    }
}

async fn context_with_jobs() -> (AppContext, Arc<InMemoryIndex>) {
    let stub = StubEmbeddingProvider::new(DIM);
    let index = Arc::new(InMemoryIndex::new());

    index
        .add_job(
            job(
                "Rust Payments Engineer",
                "Rust backend engineer building payment systems",
                vec![
                    requirement("r1", RequirementType::Required, "Built payment systems in Rust with Postgres", &stub),
                    requirement("r2", RequirementType::Required, "Kubernetes cluster operations on bare metal", &stub),
                    JobRequirement {
                        embedding: None,
                        ..requirement("r3", RequirementType::Preferred, "Nice personality", &stub)
                    },
                ],
                &stub,
            ),
            None,
        )
        .await;
    index
        .add_job(
            job(
                "Watercolor Illustrator",
                "painting watercolor illustrations for children books",
                vec![requirement("w1", RequirementType::Required, "watercolor painting portfolio", &stub)],
                &stub,
            ),
            None,
        )
        .await;

    let ctx = AppContext::new(config(), Arc::new(stub), index.clone());
    (ctx, index)
}

#[tokio::test]
async fn test_full_run_ranks_relevant_job_first() {
    let (ctx, index) = context_with_jobs().await;

    let (profiling, details) = ctx.prepare_resume(&resume()).await.unwrap();
    assert_eq!(details["actual_mode"], json!("pooled_reu"));
    assert!(index.summary_details(&profiling.fingerprint).await.is_some());

    let results = ctx
        .matcher_service()
        .match_resume_two_stage(&profiling, None, None, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].job.title, "Rust Payments Engineer");
    assert!(results[0].job_similarity > results[1].job_similarity);

    let top = &results[0];
    assert_eq!(top.requirement_matches.len() + top.missing_requirements.len(), 3);
    // identical text embeds identically, so r1 is covered at similarity 1.0
    let r1 = top
        .requirement_matches
        .iter()
        .find(|r| r.requirement.id == "r1")
        .expect("r1 covered");
    assert!((r1.similarity - 1.0).abs() < 1e-6);
    let r3 = top
        .missing_requirements
        .iter()
        .find(|r| r.requirement.id == "r3")
        .expect("r3 missing");
    assert!(r3.evidence.is_none());
    assert_eq!(r3.similarity, 0.0);

    assert_eq!(top.coverage.required_total, 2);
    assert_eq!(top.coverage.preferred_total, 1);
    assert_eq!(top.coverage.preferred_coverage, 0.0);

    let explanation = explain_match(top);
    assert_eq!(explanation.per_requirement.len(), 3);
    assert_eq!(explanation.strengths[0].section, "experience");
}

#[tokio::test]
async fn test_preferences_flow_into_results() {
    let (ctx, _) = context_with_jobs().await;
    let (profiling, _) = ctx.prepare_resume(&resume()).await.unwrap();

    let mut prefs = UserPreferences::default();
    prefs.job_preferences.location_preferences.preferred_locations = vec!["berlin".to_string()];
    prefs.company_preferences.industry.preferred = vec!["fintech".to_string()];

    let results = ctx
        .matcher_service()
        .match_resume_two_stage(&profiling, Some(&prefs), None, None)
        .await
        .unwrap();

    let alignment = results[0].preferences_alignment.as_ref().unwrap();
    assert_eq!(alignment.location, 0.7);
    assert_eq!(alignment.industry, 1.0);
    assert_eq!(alignment.company_size, 1.0);
    // 0.4·0.7 + 0.2·1.0 + 0.2·1.0 + 0.2·0.5
    assert!((alignment.overall_score - 0.78).abs() < 1e-9);
}

#[tokio::test]
async fn test_unprepared_resume_is_not_found() {
    let (ctx, _) = context_with_jobs().await;
    let profiling = ctx.profiler().profile_resume(&resume()).await.unwrap();

    let err = ctx
        .matcher_service()
        .match_resume_two_stage(&profiling, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::NotFound(_)));
}

#[tokio::test]
async fn test_changed_resume_gets_new_fingerprint() {
    let (ctx, _) = context_with_jobs().await;
    let (first, _) = ctx.prepare_resume(&resume()).await.unwrap();

    let mut edited = resume();
    edited.skills[0].name = "Go".to_string();
    let (second, _) = ctx.prepare_resume(&edited).await.unwrap();

    assert_ne!(first.fingerprint, second.fingerprint);
}

/// Delegates to an inner index and trips the flag on the first evidence lookup.
struct CancelOnFirstLookup {
    inner: Arc<InMemoryIndex>,
    flag: CancellationFlag,
}

#[async_trait]
impl MatchIndex for CancelOnFirstLookup {
    async fn find_best_evidence_for_requirement(
        &self,
        requirement_embedding: &[f32],
        resume_fingerprint: &str,
        top_k: usize,
    ) -> Result<Vec<EvidenceHit>, MatchError> {
        self.flag.cancel();
        self.inner
            .find_best_evidence_for_requirement(requirement_embedding, resume_fingerprint, top_k)
            .await
    }

    async fn get_top_jobs_by_summary_embedding(
        &self,
        resume_embedding: &[f32],
        limit: usize,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<JobHit>, MatchError> {
        self.inner
            .get_top_jobs_by_summary_embedding(resume_embedding, limit, tenant_id)
            .await
    }

    async fn get_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
    ) -> Result<Option<Embedding>, MatchError> {
        self.inner.get_resume_summary_embedding(resume_fingerprint).await
    }

    async fn save_evidence_units(
        &self,
        resume_fingerprint: &str,
        units: &[EvidenceUnit],
    ) -> Result<(), MatchError> {
        self.inner.save_evidence_units(resume_fingerprint, units).await
    }

    async fn save_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
        embedding: &[f32],
        details: &Value,
    ) -> Result<(), MatchError> {
        self.inner
            .save_resume_summary_embedding(resume_fingerprint, embedding, details)
            .await
    }
}

#[tokio::test]
async fn test_cancellation_mid_run_keeps_finished_candidate() {
    let (ctx, index) = context_with_jobs().await;
    let (profiling, _) = ctx.prepare_resume(&resume()).await.unwrap();

    let flag = CancellationFlag::new();
    let wrapped = Arc::new(CancelOnFirstLookup {
        inner: index,
        flag: flag.clone(),
    });
    let service = MatcherService::new(wrapped, MatcherConfig::default(), PreferenceWeights::default());

    let results = service
        .match_resume_two_stage(&profiling, None, None, Some(&flag))
        .await
        .unwrap();

    // The first candidate finishes its Stage-2 pass; the second is never started.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job.title, "Rust Payments Engineer");
    assert_eq!(
        results[0].requirement_matches.len() + results[0].missing_requirements.len(),
        3
    );
}
