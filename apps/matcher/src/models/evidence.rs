use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Embedding;

/// What produced an evidence unit during profiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Summary,
    Description,
    TechKeyword,
    Skill,
    Project,
    Education,
}

/// Metadata attached to an evidence unit.
///
/// Known keys are typed; anything else a producer emits lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceTags {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EvidenceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proficiency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_experience: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_current: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EvidenceTags {
    pub fn of_kind(kind: EvidenceKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }
}

/// One atomic claim extracted from a resume.
///
/// Created once per profiling pass; `embedding` and the `years_*` fields are
/// filled in place by later enrichment steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceUnit {
    pub id: String,
    pub text: String,
    /// Free-form section label as found in the resume, e.g. "Work Experience".
    pub source_section: String,
    #[serde(default)]
    pub tags: EvidenceTags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
    #[serde(default)]
    pub years_value: Option<f64>,
    #[serde(default)]
    pub years_context: Option<String>,
    #[serde(default)]
    pub is_total_years_claim: bool,
}

impl EvidenceUnit {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        source_section: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source_section: source_section.into(),
            tags: EvidenceTags::default(),
            embedding: None,
            years_value: None,
            years_context: None,
            is_total_years_claim: false,
        }
    }

    pub fn with_tags(mut self, tags: EvidenceTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_unit_has_no_enrichment() {
        let unit = EvidenceUnit::new("reu_0", "Python development experience", "experience");
        assert_eq!(unit.tags, EvidenceTags::default());
        assert!(unit.embedding.is_none());
        assert!(unit.years_value.is_none());
        assert!(unit.years_context.is_none());
        assert!(!unit.is_total_years_claim);
    }

    #[test]
    fn test_tags_keep_unknown_keys_in_extra() {
        let tags: EvidenceTags = serde_json::from_value(json!({
            "type": "skill",
            "skill": "Rust",
            "level": "expert"
        }))
        .unwrap();
        assert_eq!(tags.kind, Some(EvidenceKind::Skill));
        assert_eq!(tags.skill.as_deref(), Some("Rust"));
        assert_eq!(tags.extra.get("level"), Some(&json!("expert")));
    }

    #[test]
    fn test_tags_serialize_round_trip_extra() {
        let mut tags = EvidenceTags::of_kind(EvidenceKind::TechKeyword);
        tags.technology = Some("Kafka".to_string());
        tags.extra.insert("index".to_string(), json!(2));
        let value = serde_json::to_value(&tags).unwrap();
        assert_eq!(value["type"], json!("tech_keyword"));
        assert_eq!(value["index"], json!(2));
        assert!(value.get("company").is_none());
    }
}
