//! Unified error types shared across the Relay crates.

use thiserror::Error;

/// Unified error type for the Relay workspace.
///
/// Covers configuration, persistence, and infrastructure failures that are
/// not specific to a single job execution. Job-level errors live in
/// `relay-jobs`.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a database error.
    #[must_use]
    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RelayError::not_found("job", "abc-123");
        let msg = err.to_string();
        assert!(msg.contains("job") && msg.contains("abc-123"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RelayError::validation("x").error_code(), "VALIDATION_ERROR");
        assert_eq!(RelayError::database("x").error_code(), "DATABASE_ERROR");
        assert_eq!(
            RelayError::configuration("x").error_code(),
            "CONFIGURATION_ERROR"
        );
        assert_eq!(RelayError::internal("x").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = RelayError::from(parse_err);
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
