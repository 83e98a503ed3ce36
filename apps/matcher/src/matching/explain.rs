//! Section-level explanation of a match: which resume sections carried the
//! requirements and which were weak.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::matching::stage1::normalize_section_name;
use crate::models::matching::JobMatchPreliminary;

const MAX_STRENGTHS: usize = 3;
const GAP_THRESHOLD: f64 = 0.5;
const SNIPPET_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementExplanation {
    pub requirement_id: String,
    pub requirement_text: String,
    pub similarity: f64,
    pub is_covered: bool,
    /// Canonical section of the best evidence, if any was found.
    pub best_section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub avg_similarity: f64,
    pub max_similarity: f64,
    pub requirements_covered: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionScore {
    pub section: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchExplanation {
    pub per_requirement: Vec<RequirementExplanation>,
    pub section_summary: BTreeMap<String, SectionSummary>,
    pub strengths: Vec<SectionScore>,
    pub gaps: Vec<SectionScore>,
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

pub fn explain_match(preliminary: &JobMatchPreliminary) -> MatchExplanation {
    let per_requirement: Vec<RequirementExplanation> = preliminary
        .requirement_matches
        .iter()
        .chain(&preliminary.missing_requirements)
        .map(|result| RequirementExplanation {
            requirement_id: result.requirement.id.clone(),
            requirement_text: snippet(&result.requirement.text),
            similarity: result.similarity,
            is_covered: result.is_covered,
            best_section: result
                .evidence
                .as_ref()
                .map(|e| normalize_section_name(&e.source_section)),
        })
        .collect();

    let mut scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for explanation in &per_requirement {
        if let Some(section) = &explanation.best_section {
            scores
                .entry(section.clone())
                .or_default()
                .push(explanation.similarity);
        }
    }

    let section_summary: BTreeMap<String, SectionSummary> = scores
        .into_iter()
        .map(|(section, values)| {
            let summary = SectionSummary {
                avg_similarity: values.iter().sum::<f64>() / values.len() as f64,
                max_similarity: values.iter().copied().fold(0.0, f64::max),
                requirements_covered: values.len(),
            };
            (section, summary)
        })
        .collect();

    let mut ranked: Vec<SectionScore> = per_requirement
        .iter()
        .filter(|e| e.similarity > 0.0)
        .filter_map(|e| {
            e.best_section.as_ref().map(|section| SectionScore {
                section: section.clone(),
                score: e.similarity,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(MAX_STRENGTHS);

    let gaps = section_summary
        .iter()
        .filter(|(_, s)| s.avg_similarity < GAP_THRESHOLD)
        .map(|(section, s)| SectionScore {
            section: section.clone(),
            score: s.avg_similarity,
        })
        .collect();

    MatchExplanation {
        per_requirement,
        section_summary,
        strengths: ranked,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evidence::EvidenceUnit;
    use crate::models::job::{JobPost, JobRequirement, RequirementType};
    use crate::models::matching::{CoverageSummary, RequirementMatchResult};
    use uuid::Uuid;

    fn result(id: &str, section: Option<&str>, similarity: f64, covered: bool) -> RequirementMatchResult {
        RequirementMatchResult {
            requirement: JobRequirement {
                id: id.to_string(),
                req_type: RequirementType::Required,
                text: "x".repeat(150),
                embedding: None,
                min_years: None,
                years_context: None,
            },
            evidence: section.map(|s| EvidenceUnit::new("reu", "evidence", s)),
            similarity,
            is_covered: covered,
        }
    }

    fn preliminary(matched: Vec<RequirementMatchResult>, missing: Vec<RequirementMatchResult>) -> JobMatchPreliminary {
        JobMatchPreliminary {
            job: JobPost {
                id: Uuid::nil(),
                title: "Engineer".to_string(),
                company: "Acme".to_string(),
                location_text: None,
                is_remote: true,
                company_num_employees: None,
                company_industry: None,
                job_level: None,
                requirements: vec![],
            },
            job_similarity: 0.8,
            preferences_alignment: None,
            requirement_matches: matched,
            missing_requirements: missing,
            coverage: CoverageSummary::default(),
            resume_fingerprint: "fp".to_string(),
        }
    }

    #[test]
    fn test_sections_grouped_by_canonical_name() {
        let explanation = explain_match(&preliminary(
            vec![
                result("r1", Some("Work Experience"), 0.9, true),
                result("r2", Some("Experience"), 0.7, true),
            ],
            vec![
                result("r3", Some("Skills"), 0.4, false),
                result("r4", None, 0.0, false),
            ],
        ));

        let experience = &explanation.section_summary["experience"];
        assert!((experience.avg_similarity - 0.8).abs() < 1e-9);
        assert_eq!(experience.max_similarity, 0.9);
        assert_eq!(experience.requirements_covered, 2);
        assert_eq!(explanation.per_requirement.len(), 4);
        assert_eq!(explanation.per_requirement[0].requirement_text.len(), 100);
        assert!(explanation.per_requirement[3].best_section.is_none());

        assert_eq!(explanation.gaps.len(), 1);
        assert_eq!(explanation.gaps[0].section, "skills");
    }

    #[test]
    fn test_strengths_are_top_three() {
        let explanation = explain_match(&preliminary(
            vec![
                result("r1", Some("Skills"), 0.95, true),
                result("r2", Some("Summary"), 0.7, true),
                result("r3", Some("Projects"), 0.8, true),
                result("r4", Some("Experience"), 0.75, true),
            ],
            vec![],
        ));

        let sections: Vec<&str> = explanation.strengths.iter().map(|s| s.section.as_str()).collect();
        assert_eq!(sections, vec!["skills", "projects", "experience"]);
        assert!(explanation.gaps.is_empty());
    }
}
