//! Answer types.

use crate::types::Note;
use serde::Serialize;

/// A retrieved note with the similarity score that surfaced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub note: Note,
    pub score: f32,
}

/// A successful answer and the notes it drew on, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagResponse {
    pub query: String,
    pub answer: String,
    pub sources: Vec<EnrichedResult>,
}
