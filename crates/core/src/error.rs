//! Error types for Recall.
//!
//! One error enum covers every crate in the workspace: configuration, I/O,
//! completion providers, the note store, the vector index and the prompt
//! system. The query pipeline keeps its own stage-aware error type and
//! converts into [`AppError`] at the command boundary.

use thiserror::Error;

/// Unified error type for Recall.
///
/// Functions return `Result<T, AppError>`; nothing panics on bad input.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion and embedding provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Note pipeline errors (query answering, sync)
    #[error("Notes error: {0}")]
    Notes(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Vector index errors
    #[error("Index error: {0}")]
    Index(String),

    /// No authenticated user for the request
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Requested record does not exist for this owner
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = AppError::Unauthenticated("no user".to_string());
        assert_eq!(err.to_string(), "Unauthenticated: no user");

        let err = AppError::NotFound("note abc".to_string());
        assert!(err.to_string().starts_with("Not found"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
