//! Retrieval-augmented answering over a user's notes.

pub mod ask;
pub mod error;
pub mod rank;
pub mod types;

pub use ask::{PipelineSettings, RecallPipeline, TOP_K};
pub use error::{QueryError, QueryStage};
pub use types::{EnrichedResult, RagResponse};
