//! Query pipeline failures.

use recall_core::AppError;
use std::fmt;
use thiserror::Error;

/// Pipeline step at which an answer attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Validate,
    Embed,
    Search,
    Hydrate,
    Complete,
}

impl QueryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStage::Validate => "validate",
            QueryStage::Embed => "embed",
            QueryStage::Search => "search",
            QueryStage::Hydrate => "hydrate",
            QueryStage::Complete => "complete",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed answer. No partial result accompanies any variant.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("note store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("completion unavailable: {0}")]
    CompletionUnavailable(String),
}

impl QueryError {
    pub fn stage(&self) -> QueryStage {
        match self {
            QueryError::InvalidQuery(_) => QueryStage::Validate,
            QueryError::EmbeddingUnavailable(_) => QueryStage::Embed,
            QueryError::IndexUnavailable(_) => QueryStage::Search,
            QueryError::StoreUnavailable(_) => QueryStage::Hydrate,
            QueryError::CompletionUnavailable(_) => QueryStage::Complete,
        }
    }

    /// Short machine-readable kind, for logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidQuery(_) => "InvalidQuery",
            QueryError::EmbeddingUnavailable(_) => "EmbeddingUnavailable",
            QueryError::IndexUnavailable(_) => "IndexUnavailable",
            QueryError::StoreUnavailable(_) => "StoreUnavailable",
            QueryError::CompletionUnavailable(_) => "CompletionUnavailable",
        }
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidQuery(msg) => AppError::InvalidInput(msg),
            other => AppError::Notes(format!("{} (stage: {})", other, other.stage())),
        }
    }
}
