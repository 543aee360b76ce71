use std::collections::HashSet;
use thiserror::Error;

use crate::config::{ServerSettings, Settings};

/// Upper bound for `resolver.max_depth`; deeper budgets only slow down cycles
pub const MAX_RESOLVER_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_server(&settings.server) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_schema(settings) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_editor(&settings.editor.color_formats) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(server: &ServerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if server.host.is_empty() {
            errors.push(ValidationError::MissingField("server.host".to_string()));
        }

        if server.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "server.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_schema(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if settings.schema.source.trim().is_empty() {
            errors.push(ValidationError::MissingField("schema.source".to_string()));
        }

        if settings.schema.watch && !settings.schema_is_local() {
            errors.push(ValidationError::InvalidValue {
                field: "schema.watch".to_string(),
                reason: "Only file sources can be watched".to_string(),
            });
        }

        let depth = settings.resolver.max_depth;
        if depth == 0 || depth > MAX_RESOLVER_DEPTH {
            errors.push(ValidationError::InvalidValue {
                field: "resolver.max_depth".to_string(),
                reason: format!("Must be between 1 and {}", MAX_RESOLVER_DEPTH),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_editor(color_formats: &[String]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for (idx, format) in color_formats.iter().enumerate() {
            if format.trim().is_empty() {
                errors.push(ValidationError::MissingField(format!(
                    "editor.color_formats[{}]",
                    idx
                )));
            } else if !seen.insert(format.to_ascii_lowercase()) {
                errors.push(ValidationError::Duplicate(format!(
                    "Color format '{}' appears more than once",
                    format
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(ConfigValidator::validate(&Settings::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        settings.schema.source = "https://example.com/schema.json".to_string();
        settings.schema.watch = true;
        settings.resolver.max_depth = 0;
        settings.editor.color_formats = vec!["color".to_string(), "COLOR".to_string()];

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("resolver.max_depth")));
    }
}
