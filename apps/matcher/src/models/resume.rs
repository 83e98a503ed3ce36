use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::MatchError;

// ────────────────────────────────────────────────────────────────────────────
// Structured resume input
// ────────────────────────────────────────────────────────────────────────────

/// Parsed resume content as handed over by the resume parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResume {
    #[serde(default)]
    pub summary: ResumeSummary,
    #[serde(default)]
    pub experience: Vec<ExperienceItem>,
    #[serde(default)]
    pub skills: Vec<SkillItem>,
    #[serde(default)]
    pub projects: Vec<ProjectItem>,
    #[serde(default)]
    pub education: Vec<EducationItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeSummary {
    #[serde(default)]
    pub text: Option<String>,
    /// Total years of experience as stated by the candidate.
    #[serde(default)]
    pub total_experience_years: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceItem {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// `YYYY-MM` or `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Same format as `start_date`; `None` or "present" for a current role.
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tech_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillItem {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub proficiency: Option<String>,
    #[serde(default)]
    pub years_experience: Option<f64>,
}

impl SkillItem {
    /// "Rust (language, expert, 4 years)" style text used for embedding.
    pub fn to_embedding_text(&self) -> String {
        let mut qualifiers: Vec<String> = Vec::new();
        if let Some(kind) = self.kind.as_deref().filter(|k| !k.is_empty()) {
            qualifiers.push(kind.to_string());
        }
        if let Some(p) = self.proficiency.as_deref().filter(|p| !p.is_empty()) {
            qualifiers.push(p.to_string());
        }
        if let Some(years) = self.years_experience {
            qualifiers.push(format!("{years} years"));
        }
        if qualifiers.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, qualifiers.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationItem {
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

impl EducationItem {
    pub fn to_embedding_text(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.degree, &self.field, &self.institution]
            .iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Profile and experience validation
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of comparing claimed with calculated total years. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceValidation {
    pub is_valid: bool,
    pub tolerance: Option<f64>,
    pub difference: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub claimed_total_years: Option<f64>,
    pub calculated_total_years: Option<f64>,
}

impl ResumeProfile {
    /// Compares the self-reported total with the date-derived total.
    ///
    /// Tolerance is `max(0.2 × claimed, 1.0)` years. Outside it the claim is
    /// flagged suspicious; nothing is ever rejected.
    pub fn validate_experience_claim(&self) -> ExperienceValidation {
        let Some(claimed) = self.claimed_total_years else {
            return ExperienceValidation {
                is_valid: true,
                tolerance: None,
                difference: None,
                message: "No explicit claim of total experience".to_string(),
            };
        };
        let Some(calculated) = self.calculated_total_years else {
            return ExperienceValidation {
                is_valid: true,
                tolerance: None,
                difference: None,
                message: format!(
                    "Claimed {claimed} years but no dated experience to compare against"
                ),
            };
        };

        let tolerance = (0.2 * claimed).max(1.0);
        let difference = (claimed - calculated).abs();

        if difference <= tolerance {
            ExperienceValidation {
                is_valid: true,
                tolerance: Some(tolerance),
                difference: Some(difference),
                message: format!(
                    "Claim is valid: claimed {claimed} years, calculated {calculated} years"
                ),
            }
        } else {
            ExperienceValidation {
                is_valid: false,
                tolerance: Some(tolerance),
                difference: Some(difference),
                message: format!(
                    "Claim is suspicious: claimed {claimed} years, calculated {calculated} years \
                     (difference {difference:.1} exceeds tolerance {tolerance:.1})"
                ),
            }
        }
    }
}

/// A month on the calendar, stored as `year * 12 + (month - 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthIndex(i64);

impl MonthIndex {
    pub fn from_date(date: NaiveDate) -> Self {
        MonthIndex(date.year() as i64 * 12 + date.month0() as i64)
    }

    /// Parses `YYYY-MM`, `YYYY-MM-DD` or `YYYY/MM`.
    /// Returns `Ok(None)` for open-ended markers such as "present".
    pub fn parse(raw: &str) -> Result<Option<Self>, MatchError> {
        let raw = raw.trim();
        let lowered = raw.to_lowercase();
        if raw.is_empty() || matches!(lowered.as_str(), "present" | "current" | "now") {
            return Ok(None);
        }

        let normalized = raw.replace('/', "-");
        let candidate = match normalized.matches('-').count() {
            1 => format!("{normalized}-01"),
            2 => normalized,
            _ => {
                return Err(MatchError::Validation(format!(
                    "Unrecognised experience date '{raw}'"
                )))
            }
        };

        NaiveDate::parse_from_str(&candidate, "%Y-%m-%d")
            .map(|d| Some(MonthIndex::from_date(d)))
            .map_err(|e| MatchError::Validation(format!("Invalid experience date '{raw}': {e}")))
    }
}

/// Sums non-overlapping experience spans and converts to years (one decimal).
///
/// Spans are inclusive of both the start and end month. Current roles and
/// open-ended entries run to `as_of`. Entries without a usable start date are
/// skipped. Returns `None` when no entry could be dated.
pub fn calculate_total_years(entries: &[ExperienceItem], as_of: NaiveDate) -> Option<f64> {
    let today = MonthIndex::from_date(as_of);
    let mut spans: Vec<(MonthIndex, MonthIndex)> = Vec::new();

    for entry in entries {
        let start = match entry.start_date.as_deref().map(MonthIndex::parse) {
            Some(Ok(Some(start))) => start,
            Some(Err(e)) => {
                warn!("Skipping experience entry at {:?}: {e}", entry.company);
                continue;
            }
            _ => continue,
        };

        let end = if entry.is_current {
            today
        } else {
            match entry.end_date.as_deref().map(MonthIndex::parse) {
                Some(Ok(Some(end))) => end,
                Some(Ok(None)) | None => today,
                Some(Err(e)) => {
                    warn!("Skipping experience entry at {:?}: {e}", entry.company);
                    continue;
                }
            }
        };

        if end < start {
            warn!(
                "Skipping experience entry at {:?}: end precedes start",
                entry.company
            );
            continue;
        }
        spans.push((start, end));
    }

    if spans.is_empty() {
        return None;
    }

    spans.sort();
    let mut total_months: i64 = 0;
    let (mut cur_start, mut cur_end) = spans[0];
    for &(start, end) in &spans[1..] {
        if start.0 <= cur_end.0 + 1 {
            cur_end = cur_end.max(end);
        } else {
            total_months += cur_end.0 - cur_start.0 + 1;
            cur_start = start;
            cur_end = end;
        }
    }
    total_months += cur_end.0 - cur_start.0 + 1;

    Some((total_months as f64 / 12.0 * 10.0).round() / 10.0)
}
