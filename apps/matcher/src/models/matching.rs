use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::evidence::EvidenceUnit;
use crate::models::job::{JobPost, JobRequirement};

/// Stage-2 outcome for a single requirement.
///
/// `evidence` is the best unit found even when it falls below the threshold,
/// so missing requirements stay explainable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementMatchResult {
    pub requirement: JobRequirement,
    pub evidence: Option<EvidenceUnit>,
    /// In [0, 1].
    pub similarity: f64,
    pub is_covered: bool,
}

/// Four preference subscores and their weighted sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencesAlignmentScore {
    pub overall_score: f64,
    pub location: f64,
    pub company_size: f64,
    pub industry: f64,
    pub role: f64,
    /// Raw inputs and weights behind each subscore.
    pub details: Value,
}

/// A requirement asking for more years than the resume shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearsGap {
    pub requirement_id: String,
    pub required: f64,
    pub found: f64,
    pub shortfall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub required_coverage: f64,
    pub preferred_coverage: f64,
    pub required_total: usize,
    pub preferred_total: usize,
    pub years_gaps: Vec<YearsGap>,
}

/// One candidate job after both matching stages, before any final scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatchPreliminary {
    pub job: JobPost,
    /// Stage-1 similarity between the resume vector and the job summary.
    pub job_similarity: f64,
    pub preferences_alignment: Option<PreferencesAlignmentScore>,
    pub requirement_matches: Vec<RequirementMatchResult>,
    pub missing_requirements: Vec<RequirementMatchResult>,
    pub coverage: CoverageSummary,
    pub resume_fingerprint: String,
}
