use serde::{Deserialize, Serialize};
use serde_json::Value;

/// User job preferences, in the shape the preferences file is stored in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub job_preferences: JobPreferences,
    #[serde(default)]
    pub company_preferences: CompanyPreferences,
    #[serde(default)]
    pub career_preferences: CareerPreferences,
}

impl UserPreferences {
    /// Reads a preferences document. `null` and `{}` mean "no preferences";
    /// any other object is parsed, even when every value it holds is a default.
    pub fn from_document(document: Value) -> Result<Option<Self>, serde_json::Error> {
        let blank = match &document {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        if blank {
            return Ok(None);
        }
        serde_json::from_value(document).map(Some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPreferences {
    #[serde(default = "default_wants_remote")]
    pub wants_remote: bool,
    #[serde(default)]
    pub location_preferences: LocationPreferences,
}

impl Default for JobPreferences {
    fn default() -> Self {
        Self {
            wants_remote: default_wants_remote(),
            location_preferences: LocationPreferences::default(),
        }
    }
}

fn default_wants_remote() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPreferences {
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[serde(default)]
    pub avoid_locations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyPreferences {
    #[serde(default)]
    pub company_size: CompanySizePreference,
    #[serde(default)]
    pub industry: IndustryPreference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySizePreference {
    #[serde(default)]
    pub employee_count: EmployeeCountRange,
}

/// Inclusive employee-count range. A missing bound is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCountRange {
    #[serde(default)]
    pub minimum: Option<u64>,
    #[serde(default)]
    pub maximum: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndustryPreference {
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerPreferences {
    #[serde(default)]
    pub role_types: Vec<String>,
    #[serde(default)]
    pub avoid_roles: Vec<String>,
    #[serde(default)]
    pub seniority_level: Option<String>,
}
