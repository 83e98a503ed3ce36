use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::MatchError;

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub index_backend: IndexBackend,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub extraction_model: String,
    pub matcher: MatcherConfig,
    pub stage1: Stage1EmbeddingConfig,
    pub preference_weights: PreferenceWeights,
    pub rust_log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Http,
    Stub,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let index_backend = match optional_env("INDEX_BACKEND").as_deref() {
            None | Some("postgres") => IndexBackend::Postgres,
            Some("memory") => IndexBackend::Memory,
            Some(other) => anyhow::bail!("INDEX_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };
        let embedding_backend = match optional_env("EMBEDDING_BACKEND").as_deref() {
            None | Some("http") => EmbeddingBackend::Http,
            Some("stub") => EmbeddingBackend::Stub,
            Some(other) => anyhow::bail!("EMBEDDING_BACKEND must be 'http' or 'stub', got '{other}'"),
        };

        let database_url = match index_backend {
            IndexBackend::Postgres => Some(require_env("DATABASE_URL")?),
            IndexBackend::Memory => optional_env("DATABASE_URL"),
        };
        let embedding_api_key = match embedding_backend {
            EmbeddingBackend::Http => Some(require_env("EMBEDDING_API_KEY")?),
            EmbeddingBackend::Stub => optional_env("EMBEDDING_API_KEY"),
        };

        let mut matcher = MatcherConfig::default();
        if let Some(v) = optional_env("MATCH_SIMILARITY_THRESHOLD") {
            matcher.similarity_threshold = v
                .parse()
                .context("MATCH_SIMILARITY_THRESHOLD must be a number")?;
        }
        if let Some(v) = optional_env("MATCH_BATCH_SIZE") {
            matcher.batch_size = v.parse().context("MATCH_BATCH_SIZE must be a positive integer")?;
        }
        if let Some(v) = optional_env("MATCH_TOP_K") {
            matcher.top_k = v.parse().context("MATCH_TOP_K must be a positive integer")?;
        }

        let mut stage1 = Stage1EmbeddingConfig::default();
        if let Some(v) = optional_env("STAGE1_MODE") {
            stage1.mode = Stage1Mode::from(v);
        }
        if let Some(v) = optional_env("STAGE1_POOLING_METHOD") {
            stage1.pooling_method = PoolingMethod::from(v);
        }
        if let Some(v) = optional_env("STAGE1_TEXT_SLICE_LIMIT") {
            stage1.text_evidence_slice_limit = v
                .parse()
                .context("STAGE1_TEXT_SLICE_LIMIT must be a positive integer")?;
        }
        if let Some(v) = optional_env("EMBEDDING_DIM") {
            stage1.embedding_dim = Some(v.parse().context("EMBEDDING_DIM must be a positive integer")?);
        }
        if let Some(v) = optional_env("STAGE1_SECTION_WEIGHTS") {
            // listed sections override the defaults, the rest keep theirs
            stage1.section_weights.extend(parse_section_weights(&v)?);
        }

        let mut preference_weights = PreferenceWeights::default();
        for (key, slot) in [
            ("PREF_WEIGHT_LOCATION", &mut preference_weights.location),
            ("PREF_WEIGHT_COMPANY_SIZE", &mut preference_weights.company_size),
            ("PREF_WEIGHT_INDUSTRY", &mut preference_weights.industry),
            ("PREF_WEIGHT_ROLE", &mut preference_weights.role),
        ] {
            if let Some(v) = optional_env(key) {
                *slot = v.parse().with_context(|| format!("{key} must be a number"))?;
            }
        }

        matcher.validate()?;
        stage1.validate()?;
        preference_weights.validate()?;
        if (preference_weights.sum() - 1.0).abs() > 1e-6 {
            warn!(
                "Preference weights sum to {:.3}, not 1.0; overall scores are not renormalised",
                preference_weights.sum()
            );
        }

        Ok(Config {
            database_url,
            index_backend,
            embedding_backend,
            embedding_api_url: optional_env("EMBEDDING_API_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            embedding_api_key,
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            extraction_model: optional_env("EXTRACTION_MODEL")
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            matcher,
            stage1,
            preference_weights,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses a JSON object of canonical section name to weight,
/// e.g. `{"summary": 3.0, "projects": 1.0}`. Names are trimmed and lowercased.
pub fn parse_section_weights(raw: &str) -> Result<HashMap<String, f64>, MatchError> {
    let weights: HashMap<String, f64> = serde_json::from_str(raw).map_err(|e| {
        MatchError::Configuration(format!("STAGE1_SECTION_WEIGHTS must be a JSON object of numbers: {e}"))
    })?;
    Ok(weights
        .into_iter()
        .map(|(section, weight)| (section.trim().to_lowercase(), weight))
        .collect())
}

// ────────────────────────────────────────────────────────────────────────────
// Matching
// ────────────────────────────────────────────────────────────────────────────

/// Resume-matching parameters shared by Stage-1 retrieval and Stage-2 coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum requirement similarity for coverage, compared with `>=`.
    pub similarity_threshold: f64,
    /// Maximum number of Stage-1 candidates per run.
    pub batch_size: usize,
    /// Evidence units fetched per requirement; only the best one is used.
    pub top_k: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.65,
            batch_size: 50,
            top_k: 1,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<(), MatchError> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold < 1.0) {
            return Err(MatchError::Configuration(format!(
                "similarity_threshold must be in (0, 1), got {}",
                self.similarity_threshold
            )));
        }
        if self.batch_size == 0 {
            return Err(MatchError::Configuration("batch_size must be > 0".to_string()));
        }
        if self.top_k == 0 {
            return Err(MatchError::Configuration("top_k must be > 0".to_string()));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stage-1 embedding
// ────────────────────────────────────────────────────────────────────────────

/// How the Stage-1 resume vector is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Stage1Mode {
    /// Embed the concatenated text of the first N evidence units.
    Text,
    /// Pool the evidence-unit embeddings already computed for Stage-2.
    PooledReu,
    /// Anything else; handled as pooled with `fallback_reason = "unknown_mode"`.
    Unknown(String),
}

impl Stage1Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Stage1Mode::Text => "text",
            Stage1Mode::PooledReu => "pooled_reu",
            Stage1Mode::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for Stage1Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage1Mode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "text" => Stage1Mode::Text,
            "pooled_reu" => Stage1Mode::PooledReu,
            other => Stage1Mode::Unknown(other.to_string()),
        })
    }
}

impl From<String> for Stage1Mode {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}

impl From<Stage1Mode> for String {
    fn from(mode: Stage1Mode) -> Self {
        mode.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum PoolingMethod {
    WeightedMean,
    Mean,
    Unknown(String),
}

impl PoolingMethod {
    pub fn as_str(&self) -> &str {
        match self {
            PoolingMethod::WeightedMean => "weighted_mean",
            PoolingMethod::Mean => "mean",
            PoolingMethod::Unknown(raw) => raw,
        }
    }
}

impl FromStr for PoolingMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "weighted_mean" => PoolingMethod::WeightedMean,
            "mean" => PoolingMethod::Mean,
            other => PoolingMethod::Unknown(other.to_string()),
        })
    }
}

impl From<String> for PoolingMethod {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl From<PoolingMethod> for String {
    fn from(method: PoolingMethod) -> Self {
        method.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage1EmbeddingConfig {
    pub mode: Stage1Mode,
    pub pooling_method: PoolingMethod,
    /// Canonical section → weight. Sections with weight 0 are excluded from pooling.
    pub section_weights: HashMap<String, f64>,
    pub text_evidence_slice_limit: usize,
    /// Used when no evidence unit carries an embedding.
    pub embedding_dim: Option<usize>,
}

impl Default for Stage1EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: Stage1Mode::PooledReu,
            pooling_method: PoolingMethod::WeightedMean,
            section_weights: HashMap::from([
                ("summary".to_string(), 3.0),
                ("skills".to_string(), 2.0),
                ("experience".to_string(), 1.5),
                ("projects".to_string(), 0.5),
                ("education".to_string(), 0.0),
            ]),
            text_evidence_slice_limit: 10,
            embedding_dim: None,
        }
    }
}

impl Stage1EmbeddingConfig {
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.text_evidence_slice_limit == 0 {
            return Err(MatchError::Configuration(
                "text_evidence_slice_limit must be > 0".to_string(),
            ));
        }
        if let Some((section, w)) = self
            .section_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(MatchError::Configuration(format!(
                "section weight for '{section}' must be >= 0, got {w}"
            )));
        }
        if self.embedding_dim == Some(0) {
            return Err(MatchError::Configuration("embedding_dim must be > 0".to_string()));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Preferences
// ────────────────────────────────────────────────────────────────────────────

/// Weights of the four preference subscores. Not renormalised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PreferenceWeights {
    pub location: f64,
    pub company_size: f64,
    pub industry: f64,
    pub role: f64,
}

impl Default for PreferenceWeights {
    fn default() -> Self {
        Self {
            location: 0.4,
            company_size: 0.2,
            industry: 0.2,
            role: 0.2,
        }
    }
}

impl PreferenceWeights {
    pub fn sum(&self) -> f64 {
        self.location + self.company_size + self.industry + self.role
    }

    /// Each weight must be finite and non-negative. The sum is not checked.
    pub fn validate(&self) -> Result<(), MatchError> {
        for (name, weight) in [
            ("location", self.location),
            ("company_size", self.company_size),
            ("industry", self.industry),
            ("role", self.role),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MatchError::Configuration(format!(
                    "preference weight '{name}' must be >= 0, got {weight}"
                )));
            }
        }
        Ok(())
    }
}
