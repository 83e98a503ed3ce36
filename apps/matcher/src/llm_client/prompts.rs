use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub const YEARS_EXTRACTION_SYSTEM: &str = "You extract years-of-experience claims from a single resume statement. \
Return only JSON that matches the supplied schema. \
Mark a claim as total experience only when it describes the whole career, not one skill or tool. \
If the statement makes no years claim, return an empty years_claims list.";

pub const YEARS_EXTRACTION_PROMPT: &str = "Resume statement:\n{text}";

pub const GENERIC_EXTRACTION_SYSTEM: &str = "You extract structured data from the supplied text. \
Return only JSON that matches the supplied schema. \
Leave a field null when the text does not state it.";

pub const GENERIC_EXTRACTION_PROMPT: &str = "Text:\n{text}";

const YEARS_CLAIMS_SCHEMA_NAME: &str = "years_claims_v1";

/// JSON schema for the years-claims extraction call.
pub static YEARS_CLAIMS_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "name": YEARS_CLAIMS_SCHEMA_NAME,
        "strict": true,
        "schema": {
            "type": "object",
            "additionalProperties": false,
            "required": ["years_claims"],
            "properties": {
                "years_claims": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["years_value", "context", "is_total_experience"],
                        "properties": {
                            "years_value": { "type": ["number", "null"] },
                            "context": { "type": ["string", "null"] },
                            "is_total_experience": { "type": "boolean" }
                        }
                    }
                }
            }
        }
    })
});

/// System prompt and user prompt template for a schema, chosen by its `name`.
/// Schemas without dedicated prompts get the generic pair.
pub fn extraction_prompts(schema: &Value) -> (&'static str, &'static str) {
    match schema.get("name").and_then(Value::as_str) {
        Some(YEARS_CLAIMS_SCHEMA_NAME) => (YEARS_EXTRACTION_SYSTEM, YEARS_EXTRACTION_PROMPT),
        _ => (GENERIC_EXTRACTION_SYSTEM, GENERIC_EXTRACTION_PROMPT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_years_schema_gets_years_prompts() {
        let (system, prompt) = extraction_prompts(&YEARS_CLAIMS_SCHEMA);
        assert_eq!(system, YEARS_EXTRACTION_SYSTEM);
        assert_eq!(prompt, YEARS_EXTRACTION_PROMPT);
    }

    #[test]
    fn test_other_schema_gets_generic_prompts() {
        let schema = json!({"name": "job_requirements_v1", "schema": {"type": "object"}});
        assert_eq!(extraction_prompts(&schema).0, GENERIC_EXTRACTION_SYSTEM);
        assert_eq!(extraction_prompts(&json!({})).1, GENERIC_EXTRACTION_PROMPT);
    }
}
