//! Years-of-experience claims.
//!
//! The pattern pass is deterministic and runs during profiling. The semantic
//! pass asks the provider for structured claims and is opt-in.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm_client::prompts::YEARS_CLAIMS_SCHEMA;
use crate::models::evidence::EvidenceUnit;
use crate::provider::AiProvider;

/// Texts shorter than this are not worth a provider call.
const MIN_SEMANTIC_TEXT_LEN: usize = 10;

const TOTAL_CONTEXT: &str = "total";

// Tried in order; the first hit wins.
static TOTAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(\d+(?:\.\d+)?)\+?\s*years?\s+(?:of\s+)?(?:total\s+)?(?:professional\s+)?(?:career\s+)?(?:overall\s+)?experience",
        r"total\s+(?:of\s+)?(\d+(?:\.\d+)?)\+?\s*years?",
        r"over\s+(\d+(?:\.\d+)?)\+?\s*years?\s+(?:of\s+)?(?:professional\s+)?experience",
    ])
});

static CONTEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(\d+(?:\.\d+)?)\+?\s*years?\s+(?:of\s+)?([^,.;]+)",
        r"(\d+(?:\.\d+)?)\+?\s*yrs?\s+(?:of\s+)?([^,.;]+)",
    ])
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static LEADING_CONNECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:of|in|with|using)\s+").expect("valid regex"));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

/// Outcome of the pattern pass for one text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearsClaim {
    pub years: Option<f64>,
    pub context: Option<String>,
    pub is_total_claim: bool,
}

impl YearsClaim {
    fn total(years: f64) -> Self {
        Self {
            years: Some(years),
            context: Some(TOTAL_CONTEXT.to_string()),
            is_total_claim: true,
        }
    }
}

/// Pattern pass: total-experience phrasing first, then "N years of <context>".
pub fn extract_from_text(text: &str) -> YearsClaim {
    if text.trim().is_empty() {
        return YearsClaim::default();
    }
    let lowered = text.to_lowercase();

    for pattern in TOTAL_PATTERNS.iter() {
        if let Some(years) = pattern
            .captures(&lowered)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            return YearsClaim::total(years);
        }
    }

    for pattern in CONTEXT_PATTERNS.iter() {
        let Some(caps) = pattern.captures(&lowered) else {
            continue;
        };
        let Some(years) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) else {
            continue;
        };
        let raw = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
        let context = LEADING_CONNECTOR.replace(&collapsed, "").into_owned();
        return YearsClaim {
            years: Some(years),
            context: Some(context),
            is_total_claim: false,
        };
    }

    YearsClaim::default()
}

/// Runs the pattern pass over every unit, writing hits in place.
/// Returns the number of units that received a claim.
pub fn annotate_units(units: &mut [EvidenceUnit]) -> usize {
    let mut annotated = 0;
    for unit in units.iter_mut() {
        let claim = extract_from_text(&unit.text);
        if let Some(years) = claim.years {
            unit.years_value = Some(years);
            unit.years_context = claim.context;
            unit.is_total_years_claim = claim.is_total_claim;
            annotated += 1;
            if unit.is_total_years_claim {
                debug!("Total-experience claim in {}: {} years", unit.id, years);
            }
        }
    }
    annotated
}

// ────────────────────────────────────────────────────────────────────────────
// Semantic pass
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ExtractedClaims {
    #[serde(default)]
    years_claims: Vec<ExtractedClaim>,
}

#[derive(Debug, Deserialize)]
struct ExtractedClaim {
    #[serde(default)]
    years_value: Value,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    is_total_experience: bool,
}

/// Reads a claimed value that may come back as a number or a numeric string.
fn years_from_value(value: &Value) -> Option<Result<f64, String>> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.as_f64().ok_or_else(|| n.to_string())),
        Value::String(s) => Some(s.trim().parse::<f64>().map_err(|_| s.clone())),
        other => Some(Err(other.to_string())),
    }
}

/// Provider-backed refinement of the pattern pass.
pub struct YearsExtractor {
    provider: Arc<dyn AiProvider>,
}

impl YearsExtractor {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Asks the provider for a structured years claim per unit and keeps the
    /// first one. A failure on one unit is logged and the rest continue.
    /// Returns the number of units updated.
    pub async fn extract_from_evidence(&self, units: &mut [EvidenceUnit]) -> usize {
        let mut updated = 0;

        for unit in units.iter_mut() {
            if unit.text.chars().count() < MIN_SEMANTIC_TEXT_LEN {
                continue;
            }

            let raw = match self
                .provider
                .extract_structured_data(&unit.text, &YEARS_CLAIMS_SCHEMA)
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Failed to extract years from evidence {}: {}", unit.id, e);
                    continue;
                }
            };

            let claims: ExtractedClaims = match serde_json::from_value(raw) {
                Ok(claims) => claims,
                Err(e) => {
                    warn!("Malformed years claims for evidence {}: {}", unit.id, e);
                    continue;
                }
            };

            let Some(claim) = claims.years_claims.into_iter().next() else {
                continue;
            };

            match years_from_value(&claim.years_value) {
                None => {}
                Some(Ok(years)) => {
                    unit.years_value = Some(years);
                    unit.years_context = claim.context;
                    unit.is_total_years_claim = claim.is_total_experience;
                    updated += 1;
                    debug!(
                        "Extracted from evidence {}: {} years of {:?} (total={})",
                        unit.id, years, unit.years_context, unit.is_total_years_claim
                    );
                }
                Some(Err(raw)) => {
                    warn!("Invalid years_value for evidence {}: {}", unit.id, raw);
                }
            }
        }

        updated
    }
}
