//! Preference alignment: four heuristic subscores and their weighted sum.

use serde_json::{json, Value};

use crate::config::PreferenceWeights;
use crate::models::job::JobPost;
use crate::models::matching::PreferencesAlignmentScore;
use crate::models::preferences::UserPreferences;

// ── Location policy ─────────────────────────────────────────────────────────
const REMOTE_WANTED_REMOTE_JOB: f64 = 1.0;
const REMOTE_WANTED_PREFERRED_ONSITE: f64 = 0.7;
const REMOTE_WANTED_AVOIDED_ONSITE: f64 = 0.0;
const REMOTE_WANTED_OTHER_ONSITE: f64 = 0.3;
const ONSITE_WANTED_REMOTE_JOB: f64 = 0.8;
const ONSITE_WANTED_PREFERRED_ONSITE: f64 = 1.0;
const ONSITE_WANTED_OTHER_ONSITE: f64 = 0.6;

const NEUTRAL: f64 = 0.5;
const SENIORITY_MATCH: f64 = 0.8;

/// Case-insensitive "haystack contains any needle"; blank needles never match.
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .map(|n| n.trim().to_lowercase())
        .any(|n| !n.is_empty() && haystack.contains(&n))
}

pub struct PreferenceMatcher {
    weights: PreferenceWeights,
}

impl PreferenceMatcher {
    pub fn new(weights: PreferenceWeights) -> Self {
        Self { weights }
    }

    /// `None` when no preferences were supplied. Supplied preferences are
    /// always scored, even when they hold only default values.
    ///
    /// `overall_score` is the weighted sum as configured; weights are not
    /// renormalised.
    pub fn calculate_alignment(
        &self,
        job: &JobPost,
        preferences: Option<&UserPreferences>,
    ) -> Option<PreferencesAlignmentScore> {
        let preferences = preferences?;

        let (location, location_details) = self.location_score(job, preferences);
        let (company_size, size_details) = self.company_size_score(job, preferences);
        let (industry, industry_details) = self.industry_score(job, preferences);
        let (role, role_details) = self.role_score(job, preferences);

        let w = &self.weights;
        let overall_score = location * w.location
            + company_size * w.company_size
            + industry * w.industry
            + role * w.role;

        Some(PreferencesAlignmentScore {
            overall_score,
            location,
            company_size,
            industry,
            role,
            details: json!({
                "location": location_details,
                "company_size": size_details,
                "industry": industry_details,
                "role": role_details,
                "weights": {
                    "location": w.location,
                    "company_size": w.company_size,
                    "industry": w.industry,
                    "role": w.role,
                },
            }),
        })
    }

    pub fn location_score(&self, job: &JobPost, preferences: &UserPreferences) -> (f64, Value) {
        let job_prefs = &preferences.job_preferences;
        let locations = &job_prefs.location_preferences;
        let details = json!({
            "job_location": job.location_text,
            "job_is_remote": job.is_remote,
            "user_wants_remote": job_prefs.wants_remote,
            "preferred_locations": locations.preferred_locations,
            "avoid_locations": locations.avoid_locations,
        });

        let job_location = job.location_text.as_deref().unwrap_or_default().to_lowercase();
        let preferred = contains_any(&job_location, &locations.preferred_locations);

        let score = match (job_prefs.wants_remote, job.is_remote) {
            (true, true) => REMOTE_WANTED_REMOTE_JOB,
            (true, false) if preferred => REMOTE_WANTED_PREFERRED_ONSITE,
            (true, false) if contains_any(&job_location, &locations.avoid_locations) => {
                REMOTE_WANTED_AVOIDED_ONSITE
            }
            (true, false) => REMOTE_WANTED_OTHER_ONSITE,
            (false, true) => ONSITE_WANTED_REMOTE_JOB,
            (false, false) if preferred => ONSITE_WANTED_PREFERRED_ONSITE,
            (false, false) => ONSITE_WANTED_OTHER_ONSITE,
        };
        (score, details)
    }

    pub fn company_size_score(&self, job: &JobPost, preferences: &UserPreferences) -> (f64, Value) {
        let range = &preferences.company_preferences.company_size.employee_count;
        let details = json!({
            "job_company_size": job.company_num_employees,
            "preferred_size": {
                "minimum": range.minimum,
                "maximum": range.maximum,
            },
        });

        let Some(count) = job
            .company_num_employees
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
        else {
            return (NEUTRAL, details);
        };

        let count = count as f64;
        let min = range.minimum.unwrap_or(0) as f64;
        let max = range.maximum.map(|m| m as f64).unwrap_or(f64::INFINITY);

        let score = if count >= min && count <= max {
            1.0
        } else if count < min {
            // min > count >= 0 here, so min is non-zero
            (count / min * 0.5).max(0.0)
        } else if count > 0.0 {
            (max / count * 0.5).max(0.0)
        } else {
            0.0
        };
        (score, details)
    }

    pub fn industry_score(&self, job: &JobPost, preferences: &UserPreferences) -> (f64, Value) {
        let industry = &preferences.company_preferences.industry;
        let details = json!({
            "job_industry": job.company_industry,
            "preferred_industries": industry.preferred,
            "avoid_industries": industry.avoid,
        });

        let job_industry = job.company_industry.as_deref().unwrap_or_default().to_lowercase();
        let score = if contains_any(&job_industry, &industry.avoid) {
            0.0
        } else if contains_any(&job_industry, &industry.preferred) {
            1.0
        } else {
            NEUTRAL
        };
        (score, details)
    }

    pub fn role_score(&self, job: &JobPost, preferences: &UserPreferences) -> (f64, Value) {
        let career = &preferences.career_preferences;
        let details = json!({
            "job_title": job.title,
            "job_level": job.job_level,
            "preferred_roles": career.role_types,
            "avoid_roles": career.avoid_roles,
            "seniority_level": career.seniority_level,
        });

        let title = job.title.to_lowercase();
        let job_level = job.job_level.as_deref().unwrap_or_default().to_lowercase();
        let seniority = career
            .seniority_level
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let score = if contains_any(&title, &career.avoid_roles) {
            0.0
        } else if contains_any(&title, &career.role_types) {
            1.0
        } else if seniority.is_some_and(|s| !job_level.is_empty() && job_level.contains(&s)) {
            SENIORITY_MATCH
        } else {
            NEUTRAL
        };
        (score, details)
    }
}
