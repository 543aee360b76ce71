//! Schema loading error types

use thiserror::Error;

/// Errors raised while loading the theme schema document.
///
/// All of them are fatal for the editing session: no partial schema is usable,
/// so the host surfaces them as "cannot load editor". The type is `Clone` because
/// one failed fetch is reported to every caller that was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum SchemaLoadError {
    /// The document does not exist at the configured location
    #[error("Schema document not found: {0}")]
    NotFound(String),

    /// The document exists but could not be read
    #[error("Failed to read schema document '{location}': {message}")]
    Io { location: String, message: String },

    /// HTTP transport or status failure
    #[error("Failed to fetch schema document '{location}': {message}")]
    Http { location: String, message: String },

    /// The document is not valid JSON
    #[error("Schema document is not valid JSON: {0}")]
    InvalidJson(String),

    /// The document parsed but its root is not an object
    #[error("Schema document root must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// The background fetch task died before producing a result
    #[error("Schema load was interrupted: {0}")]
    Interrupted(String),
}

impl From<serde_json::Error> for SchemaLoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}

impl SchemaLoadError {
    /// Convert to HTTP status code for API responses
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NotFound(_) | Self::Io { .. } | Self::Http { .. } | Self::Interrupted(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::InvalidJson(_) | Self::NotAnObject(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
