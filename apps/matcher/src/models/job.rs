use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Embedding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    Required,
    Preferred,
    Responsibility,
    Constraint,
    Benefit,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Required => "required",
            RequirementType::Preferred => "preferred",
            RequirementType::Responsibility => "responsibility",
            RequirementType::Constraint => "constraint",
            RequirementType::Benefit => "benefit",
        }
    }

    /// Parses stored labels, including the extraction schema's
    /// `must_have` / `nice_to_have` spellings.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "required" | "must_have" => Some(RequirementType::Required),
            "preferred" | "nice_to_have" => Some(RequirementType::Preferred),
            "responsibility" => Some(RequirementType::Responsibility),
            "constraint" => Some(RequirementType::Constraint),
            "benefit" => Some(RequirementType::Benefit),
            _ => None,
        }
    }
}

/// One line item of a job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequirement {
    pub id: String,
    pub req_type: RequirementType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
    #[serde(default)]
    pub min_years: Option<f64>,
    #[serde(default)]
    pub years_context: Option<String>,
}

/// The job-posting fields the matcher reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPost {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location_text: Option<String>,
    #[serde(default)]
    pub is_remote: bool,
    /// Raw employee count as scraped; may be missing or non-numeric.
    #[serde(default)]
    pub company_num_employees: Option<String>,
    #[serde(default)]
    pub company_industry: Option<String>,
    #[serde(default)]
    pub job_level: Option<String>,
    #[serde(default)]
    pub requirements: Vec<JobRequirement>,
}

/// A job posting plus the summary embedding used for Stage-1 ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateJob {
    pub job: JobPost,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_embedding: Option<Embedding>,
}
