//! Stage-1 resume embedding: one vector per resume for coarse job retrieval.
//!
//! `pooled_reu` (default) pools the evidence-unit embeddings Stage-2 already
//! needs. `text` embeds the concatenated text of the first N units and falls
//! back to pooling when the provider is missing or fails.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::config::{PoolingMethod, Stage1EmbeddingConfig, Stage1Mode};
use crate::errors::MatchError;
use crate::matching::similarity::{ensure_same_dimension, l2_normalize};
use crate::models::evidence::EvidenceUnit;
use crate::models::Embedding;
use crate::provider::AiProvider;

/// Canonical bucket → accepted aliases. Order matters for substring matching.
const SECTION_ALIASES: &[(&str, &[&str])] = &[
    ("summary", &["summary", "summary section", "about", "profile"]),
    ("skills", &["skills", "skills section", "technical skills", "skill groups"]),
    (
        "experience",
        &[
            "experience",
            "experience section",
            "professional experience",
            "work experience",
            "work history",
        ],
    ),
    ("projects", &["projects", "project section", "portfolio"]),
    ("education", &["education", "education section", "academic", "degrees"]),
];

/// Maps a free-form section label onto a canonical bucket.
///
/// Exact alias first, then substring; anything else passes through lowercased.
pub fn normalize_section_name(section: &str) -> String {
    let lowered = section.trim().to_lowercase();

    for (canonical, aliases) in SECTION_ALIASES {
        if aliases.contains(&lowered.as_str()) {
            return canonical.to_string();
        }
    }
    for (canonical, aliases) in SECTION_ALIASES {
        if aliases.iter().any(|alias| lowered.contains(alias)) {
            return canonical.to_string();
        }
    }
    lowered
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FallbackReason {
    AiUnavailable,
    AiError,
    UnknownMode,
}

impl FallbackReason {
    fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::AiUnavailable => "ai_unavailable",
            FallbackReason::AiError => "ai_error",
            FallbackReason::UnknownMode => "unknown_mode",
        }
    }
}

/// Builds the Stage-1 resume vector plus a details record of how it was made.
pub struct ResumeEmbeddingBuilder {
    config: Stage1EmbeddingConfig,
    provider: Option<Arc<dyn AiProvider>>,
}

impl ResumeEmbeddingBuilder {
    pub fn new(config: Stage1EmbeddingConfig, provider: Option<Arc<dyn AiProvider>>) -> Self {
        Self { config, provider }
    }

    /// Returns `(embedding, details)`.
    ///
    /// `details` always carries `requested_mode` and `actual_mode`, and
    /// `fallback_reason` whenever the two differ or the mode was unknown.
    pub async fn build(&self, units: &[EvidenceUnit]) -> Result<(Embedding, Value), MatchError> {
        let (embedding, details, fallback) = match &self.config.mode {
            Stage1Mode::Text => self.build_from_text(units).await?,
            Stage1Mode::PooledReu => {
                let (embedding, details) = self.build_pooled(units)?;
                (embedding, details, None)
            }
            Stage1Mode::Unknown(raw) => {
                warn!("Unknown Stage-1 embedding mode '{}', using pooled_reu", raw);
                let (embedding, details) = self.build_pooled(units)?;
                (embedding, details, Some(FallbackReason::UnknownMode))
            }
        };

        Ok((embedding, self.with_mode_info(details, fallback)))
    }

    fn with_mode_info(&self, details: Map<String, Value>, fallback: Option<FallbackReason>) -> Value {
        let actual_mode = details
            .get("mode")
            .cloned()
            .unwrap_or_else(|| json!(Stage1Mode::PooledReu.as_str()));

        let mut result = Map::new();
        result.insert("requested_mode".to_string(), json!(self.config.mode.as_str()));
        result.insert("actual_mode".to_string(), actual_mode);
        result.extend(details);
        if let Some(reason) = fallback {
            result.insert("fallback_reason".to_string(), json!(reason.as_str()));
        }
        Value::Object(result)
    }

    // ── text mode ───────────────────────────────────────────────────────────

    async fn build_from_text(
        &self,
        units: &[EvidenceUnit],
    ) -> Result<(Embedding, Map<String, Value>, Option<FallbackReason>), MatchError> {
        // First N in extraction order, not the N most relevant.
        let limit = self.config.text_evidence_slice_limit;
        let sliced = &units[..units.len().min(limit)];
        let resume_text = sliced
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let reason = match &self.provider {
            Some(provider) => match provider.generate_embedding(&resume_text).await {
                Ok(embedding) => {
                    debug!("Stage-1 text embedding generated, dim={}", embedding.len());
                    let mut details = Map::new();
                    details.insert("mode".to_string(), json!("text"));
                    details.insert("evidence_count".to_string(), json!(sliced.len()));
                    details.insert("slice_limit".to_string(), json!(limit));
                    details.insert("method".to_string(), json!("text_embedding"));
                    details.insert("embedding_dim".to_string(), json!(embedding.len()));
                    return Ok((embedding, details, None));
                }
                Err(e) => {
                    warn!("Stage-1 text embedding failed: {}; falling back to pooled mode", e);
                    FallbackReason::AiError
                }
            },
            None => {
                debug!("Stage-1 text mode without a provider; falling back to pooled mode");
                FallbackReason::AiUnavailable
            }
        };

        let (embedding, details) = self.build_pooled(units)?;
        Ok((embedding, details, Some(reason)))
    }

    // ── pooled mode ─────────────────────────────────────────────────────────

    fn build_pooled(
        &self,
        units: &[EvidenceUnit],
    ) -> Result<(Embedding, Map<String, Value>), MatchError> {
        let mut selected = self.select_curated_subset(units);
        if selected.is_empty() {
            warn!("No curated evidence units found; falling back to all units");
            selected = units.iter().collect();
        }

        let dimension = self.determine_dimension(&selected)?;
        let pooled = match &self.config.pooling_method {
            PoolingMethod::WeightedMean => self.pool(&selected, dimension, true)?,
            PoolingMethod::Mean => self.pool(&selected, dimension, false)?,
            PoolingMethod::Unknown(raw) => {
                warn!("Unknown pooling method '{}', using weighted_mean", raw);
                self.pool(&selected, dimension, true)?
            }
        };
        let embedding = l2_normalize(&pooled);

        let mut sections_used = BTreeSet::new();
        let mut weights_applied = BTreeMap::new();
        let mut raw_to_normalized = BTreeMap::new();
        for unit in &selected {
            let canonical = normalize_section_name(&unit.source_section);
            sections_used.insert(unit.source_section.clone());
            weights_applied.insert(canonical.clone(), self.pooling_weight(&canonical));
            raw_to_normalized.insert(unit.source_section.clone(), canonical);
        }

        info!(
            "Stage-1 embedding: pooled {} of {} units from sections {:?} using {}",
            selected.len(),
            units.len(),
            sections_used,
            self.config.pooling_method.as_str()
        );

        let mut details = Map::new();
        details.insert("mode".to_string(), json!("pooled_reu"));
        details.insert("evidence_count".to_string(), json!(selected.len()));
        details.insert("total_evidence_count".to_string(), json!(units.len()));
        details.insert("sections_used".to_string(), json!(sections_used));
        details.insert(
            "pooling_method".to_string(),
            json!(self.config.pooling_method.as_str()),
        );
        details.insert("section_weights".to_string(), json!(weights_applied));
        details.insert("raw_to_normalized_mapping".to_string(), json!(raw_to_normalized));
        details.insert("method".to_string(), json!("pooled_vector"));

        Ok((embedding, details))
    }

    /// Units whose canonical section has a configured weight above zero.
    /// Unlisted sections are excluded here.
    fn select_curated_subset<'a>(&self, units: &'a [EvidenceUnit]) -> Vec<&'a EvidenceUnit> {
        units
            .iter()
            .filter(|unit| {
                let canonical = normalize_section_name(&unit.source_section);
                let weight = self
                    .config
                    .section_weights
                    .get(&canonical)
                    .copied()
                    .unwrap_or(0.0);
                if weight > 0.0 {
                    debug!("Selected {} from '{}' (weight {})", unit.id, unit.source_section, weight);
                    true
                } else {
                    debug!("Excluded {} from '{}' (weight {})", unit.id, unit.source_section, weight);
                    false
                }
            })
            .collect()
    }

    /// Weight used when pooling; unlisted sections count as 1.0.
    fn pooling_weight(&self, canonical: &str) -> f64 {
        self.config
            .section_weights
            .get(canonical)
            .copied()
            .unwrap_or(1.0)
    }

    fn determine_dimension(&self, units: &[&EvidenceUnit]) -> Result<usize, MatchError> {
        if let Some(embedding) = units.iter().find_map(|u| u.embedding.as_ref()) {
            return Ok(embedding.len());
        }
        self.config.embedding_dim.ok_or_else(|| {
            MatchError::Configuration(
                "cannot determine embedding dimension: no evidence embeddings and no embedding_dim configured"
                    .to_string(),
            )
        })
    }

    /// `Σ wᵢ·vᵢ / Σ wᵢ`, or the plain mean when `weighted` is false.
    /// Units without an embedding are skipped, never zero-filled.
    fn pool(
        &self,
        units: &[&EvidenceUnit],
        dimension: usize,
        weighted: bool,
    ) -> Result<Vec<f32>, MatchError> {
        let mut sums = vec![0.0_f64; dimension];
        let mut weight_sum = 0.0_f64;

        for unit in units {
            let Some(vector) = unit.embedding.as_deref() else {
                warn!("Evidence unit {} has no embedding; skipping in pooling", unit.id);
                continue;
            };
            ensure_same_dimension(dimension, vector.len())?;

            let weight = if weighted {
                self.pooling_weight(&normalize_section_name(&unit.source_section))
            } else {
                1.0
            };
            for (acc, x) in sums.iter_mut().zip(vector) {
                *acc += weight * (*x as f64);
            }
            weight_sum += weight;
        }

        if weight_sum <= 0.0 {
            return Ok(vec![0.0; dimension]);
        }
        Ok(sums.into_iter().map(|s| (s / weight_sum) as f32).collect())
    }
}
