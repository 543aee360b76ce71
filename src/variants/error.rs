//! Variant editing error types

use thiserror::Error;

/// Reasons a variant-map operation is refused. A refused operation leaves
/// the map exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantError {
    /// The default variant can be edited but never renamed or deleted
    #[error("The default variant '*' cannot be renamed or deleted")]
    DefaultVariantImmutable,

    /// A new name may not be the default key
    #[error("'{0}' is reserved for the default variant")]
    ReservedName(String),

    #[error("Variant name cannot be empty")]
    EmptyName,

    #[error("Variant '{name}' already exists for {visual_type}")]
    DuplicateVariant { visual_type: String, name: String },

    #[error("Variant '{name}' not found for {visual_type}")]
    VariantNotFound { visual_type: String, name: String },

    #[error("Visual type not found: {0}")]
    VisualNotFound(String),
}

impl VariantError {
    /// Convert to HTTP status code for API responses
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::DefaultVariantImmutable | Self::ReservedName(_) | Self::EmptyName => {
                StatusCode::BAD_REQUEST
            }
            Self::DuplicateVariant { .. } => StatusCode::CONFLICT,
            Self::VariantNotFound { .. } | Self::VisualNotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_messages_and_status() {
        let err = VariantError::DuplicateVariant {
            visual_type: "columnChart".to_string(),
            name: "emphasis".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Variant 'emphasis' already exists for columnChart"
        );
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            VariantError::DefaultVariantImmutable.status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
