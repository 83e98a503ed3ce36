//! Resume profiling: fingerprint, evidence units, years claims, embeddings.
//!
//! The output of this pass is what both matching stages consume. Whenever the
//! resume changes the whole set is rebuilt under the new fingerprint.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::errors::MatchError;
use crate::matching::years;
use crate::models::evidence::{EvidenceKind, EvidenceTags, EvidenceUnit};
use crate::models::resume::{calculate_total_years, ResumeProfile, StructuredResume};
use crate::provider::AiProvider;

const FINGERPRINT_LEN: usize = 32;

const SECTION_SUMMARY: &str = "Summary";
const SECTION_EXPERIENCE: &str = "Experience";
const SECTION_SKILLS: &str = "Skills";
const SECTION_PROJECTS: &str = "Projects";
const SECTION_EDUCATION: &str = "Education";

/// SHA-256 over the canonical JSON form of the resume, first 32 hex chars.
///
/// Object keys are emitted sorted, so field order never changes the result.
pub fn fingerprint(resume: &StructuredResume) -> Result<String, MatchError> {
    // serde_json::Value objects are key-sorted maps
    let canonical = serde_json::to_value(resume)
        .and_then(|v| serde_json::to_string(&v))
        .map_err(|e| MatchError::Internal(e.into()))?;

    let digest = Sha256::digest(canonical.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    Ok(hex[..FINGERPRINT_LEN].to_string())
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Splits a resume into evidence units, ids `reu_<n>` in extraction order.
pub fn extract_evidence_units(resume: &StructuredResume) -> Vec<EvidenceUnit> {
    let mut units: Vec<EvidenceUnit> = Vec::new();
    let mut push = |text: &str, section: &str, tags: EvidenceTags| {
        let id = format!("reu_{}", units.len());
        units.push(EvidenceUnit::new(id, text, section).with_tags(tags));
    };

    if let Some(summary) = non_blank(resume.summary.text.as_deref()) {
        push(summary, SECTION_SUMMARY, EvidenceTags::of_kind(EvidenceKind::Summary));
    }

    for item in &resume.experience {
        let base = EvidenceTags {
            company: item.company.clone(),
            title: item.title.clone(),
            is_current: Some(item.is_current),
            ..EvidenceTags::default()
        };

        if let Some(description) = non_blank(item.description.as_deref()) {
            push(
                description,
                SECTION_EXPERIENCE,
                EvidenceTags {
                    kind: Some(EvidenceKind::Description),
                    ..base.clone()
                },
            );
        }

        for tech in item.tech_keywords.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            push(
                &format!("Experience with {tech}"),
                SECTION_EXPERIENCE,
                EvidenceTags {
                    kind: Some(EvidenceKind::TechKeyword),
                    technology: Some(tech.to_string()),
                    ..base.clone()
                },
            );
        }
    }

    for skill in resume.skills.iter().filter(|s| !s.name.trim().is_empty()) {
        push(
            &skill.to_embedding_text(),
            SECTION_SKILLS,
            EvidenceTags {
                kind: Some(EvidenceKind::Skill),
                skill: Some(skill.name.trim().to_string()),
                skill_kind: skill.kind.clone(),
                proficiency: skill.proficiency.clone(),
                years_experience: skill.years_experience,
                ..EvidenceTags::default()
            },
        );
    }

    for project in &resume.projects {
        let Some(description) = non_blank(project.description.as_deref()) else {
            continue;
        };
        let text = match non_blank(project.name.as_deref()) {
            Some(name) => format!("{name}: {description}"),
            None => description.to_string(),
        };
        let mut tags = EvidenceTags::of_kind(EvidenceKind::Project);
        if let Some(name) = non_blank(project.name.as_deref()) {
            tags.extra.insert("project".to_string(), name.into());
        }
        push(&text, SECTION_PROJECTS, tags);
    }

    for education in &resume.education {
        if let Some(text) = education.to_embedding_text() {
            push(&text, SECTION_EDUCATION, EvidenceTags::of_kind(EvidenceKind::Education));
        }
    }

    info!("Extracted {} evidence units from resume", units.len());
    units
}

/// Claimed vs. date-derived total experience, as of `as_of`.
pub fn build_profile(resume: &StructuredResume, as_of: NaiveDate) -> ResumeProfile {
    ResumeProfile {
        claimed_total_years: resume.summary.total_experience_years,
        calculated_total_years: calculate_total_years(&resume.experience, as_of),
    }
}

/// Everything a matching run needs from one resume.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeProfiling {
    pub fingerprint: String,
    pub profile: ResumeProfile,
    pub evidence_units: Vec<EvidenceUnit>,
}

pub struct ResumeProfiler {
    provider: Arc<dyn AiProvider>,
}

impl ResumeProfiler {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Fills missing embeddings in place. A provider failure aborts the pass:
    /// Stage-2 cannot run on a partially embedded resume.
    pub async fn embed_evidence_units(&self, units: &mut [EvidenceUnit]) -> Result<usize, MatchError> {
        let mut embedded = 0;
        for unit in units.iter_mut().filter(|u| u.embedding.is_none()) {
            let embedding = self.provider.generate_embedding(&unit.text).await?;
            unit.embedding = Some(embedding);
            embedded += 1;
        }
        debug!("Embedded {} evidence units via {}", embedded, self.provider.name());
        Ok(embedded)
    }

    pub async fn profile_resume(&self, resume: &StructuredResume) -> Result<ResumeProfiling, MatchError> {
        self.profile_resume_as_of(resume, Utc::now().date_naive()).await
    }

    /// Full profiling pass with an explicit reference date for open-ended roles.
    pub async fn profile_resume_as_of(
        &self,
        resume: &StructuredResume,
        as_of: NaiveDate,
    ) -> Result<ResumeProfiling, MatchError> {
        let fingerprint = fingerprint(resume)?;

        let profile = build_profile(resume, as_of);
        let validation = profile.validate_experience_claim();
        if validation.is_valid {
            info!("Resume experience: {}", validation.message);
        } else {
            warn!("Resume experience claim validation failed: {}", validation.message);
        }

        let mut evidence_units = extract_evidence_units(resume);
        let annotated = years::annotate_units(&mut evidence_units);
        debug!("Years claims found in {} evidence units", annotated);

        self.embed_evidence_units(&mut evidence_units).await?;

        Ok(ResumeProfiling {
            fingerprint,
            profile,
            evidence_units,
        })
    }
}
