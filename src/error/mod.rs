use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Errors raised by the reflection engine itself.
///
/// These are also what the store records in its current-error slot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Escalation failed: {0}")]
    Escalation(#[from] EscalationError),
}

impl EngineError {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can keep going as if the operation succeeded.
    ///
    /// Escalation failures never roll back the reflection write.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::Escalation(_) | EngineError::NotFound { .. })
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Emergency-escalation collaborator errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EscalationError {
    #[error("escalation for reflection {reflection_id} failed: {message}")]
    Failed {
        reflection_id: String,
        message: String,
    },

    #[error("escalation service unavailable: {message}")]
    Unavailable { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for escalation calls
pub type EscalationResult<T> = Result<T, EscalationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing key");
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::validation("title", "cannot be empty");
        assert_eq!(err.to_string(), "Validation failed: title - cannot be empty");

        let err = EngineError::NotFound {
            entity: "Reflection".to_string(),
            id: "r-1".to_string(),
        };
        assert_eq!(err.to_string(), "Reflection not found: r-1");

        let err = EngineError::Serialization {
            message: "bad blob".to_string(),
        };
        assert_eq!(err.to_string(), "Serialization failed: bad blob");
    }

    #[test]
    fn test_escalation_error_display() {
        let err = EscalationError::Failed {
            reflection_id: "r-9".to_string(),
            message: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "escalation for reflection r-9 failed: timeout"
        );

        let err = EscalationError::Unavailable {
            message: "offline".to_string(),
        };
        assert_eq!(err.to_string(), "escalation service unavailable: offline");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(err.to_string(), "Database connection failed: failed to connect");

        let err = StorageError::Query {
            message: "syntax error".to_string(),
        };
        assert_eq!(err.to_string(), "Query failed: syntax error");

        let err = StorageError::Migration {
            message: "version mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Migration failed: version mismatch");
    }

    #[test]
    fn test_escalation_error_is_recoverable() {
        let err: EngineError = EscalationError::Unavailable {
            message: "down".to_string(),
        }
        .into();
        assert!(err.is_recoverable());
        assert!(!EngineError::validation("id", "missing").is_recoverable());
    }

    #[test]
    fn test_json_error_conversion_to_engine_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let engine_err: EngineError = json_err.into();
        assert!(matches!(engine_err, EngineError::Serialization { .. }));
    }

    #[test]
    fn test_engine_error_conversion_to_app_error() {
        let engine_err = EngineError::validation("content", "empty");
        let app_err: AppError = engine_err.into();
        assert!(matches!(app_err, AppError::Engine(_)));
        assert!(app_err.to_string().contains("Validation failed"));
    }

    #[test]
    fn test_storage_error_conversion_to_app_error() {
        let storage_err = StorageError::Query {
            message: "locked".to_string(),
        };
        let app_err: AppError = storage_err.into();
        assert!(matches!(app_err, AppError::Storage(_)));
    }
}
