use thiserror::Error;

use crate::provider::ProviderError;

/// Engine-level error type.
/// Provider failures that have a fallback never reach this type; they are
/// logged and recovered where they happen.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl MatchError {
    /// Stable machine-readable code, used in the JSON error report printed by the binary.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::NotFound(_) => "NOT_FOUND",
            MatchError::Validation(_) => "VALIDATION_ERROR",
            MatchError::Configuration(_) => "CONFIGURATION_ERROR",
            MatchError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            MatchError::Provider(_) => "PROVIDER_ERROR",
            MatchError::Database(e) => {
                tracing::error!("Database error: {e}");
                "DATABASE_ERROR"
            }
            MatchError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "INTERNAL_ERROR"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = MatchError::DimensionMismatch {
            expected: 3,
            actual: 4,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");
        assert_eq!(err.code(), "DIMENSION_MISMATCH");
    }

    #[test]
    fn test_provider_error_converts_with_code() {
        let err = MatchError::from(ProviderError::Unavailable);
        assert_eq!(err.code(), "PROVIDER_ERROR");
        assert_eq!(MatchError::NotFound("x".to_string()).code(), "NOT_FOUND");
    }
}
