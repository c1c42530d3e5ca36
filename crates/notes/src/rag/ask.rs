//! Answering questions from a user's own notes.
//!
//! Embed the question, search the owner's vectors, hydrate the hits from
//! the store, rank them, build the prompt and ask the completion model.
//! Each external call is bounded by the call timeout and nothing is
//! retried; the first failing step ends the attempt.

use crate::config::NotesConfig;
use crate::deadline::bounded;
use crate::embeddings::EmbeddingProvider;
use crate::rag::error::QueryError;
use crate::rag::rank;
use crate::rag::types::RagResponse;
use crate::store::NoteStore;
use crate::types::{NoteId, OwnerId};
use crate::vector_index::{OwnerFilter, VectorIndex, VectorMatch, VectorQuery};
use recall_llm::{LlmClient, LlmRequest};
use recall_prompt::{build_answer_prompt, truncate_excerpt, PromptDefinition};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Most notes considered for one answer.
pub const TOP_K: usize = 5;

/// Tunables for [`RecallPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Completion model name
    pub model: String,
    pub call_timeout: Duration,
    pub min_score: Option<f32>,
    pub max_excerpt_chars: usize,
    pub max_question_chars: usize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl PipelineSettings {
    pub fn from_config(config: &NotesConfig, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            call_timeout: config.retrieval.call_timeout(),
            min_score: config.retrieval.min_score,
            max_excerpt_chars: config.retrieval.max_excerpt_chars,
            max_question_chars: config.retrieval.max_question_chars,
            temperature: Some(config.completion.temperature),
            max_tokens: config.completion.max_tokens,
        }
    }
}

pub struct RecallPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn NoteStore>,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    settings: PipelineSettings,
}

impl RecallPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn NoteStore>,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            llm,
            prompt,
            settings,
        }
    }

    /// Answer `query_text` for `owner` from that owner's notes only.
    ///
    /// An owner with no relevant notes still gets an answer; the prompt
    /// tells the model to say it doesn't know.
    #[instrument(skip(self, query_text), fields(owner = %owner))]
    pub async fn answer(&self, owner: &OwnerId, query_text: &str) -> Result<RagResponse, QueryError> {
        let question = query_text.trim();
        if question.is_empty() {
            return Err(QueryError::InvalidQuery("question is empty".to_string()));
        }
        let question = truncate_excerpt(question, self.settings.max_question_chars);

        let limit = self.settings.call_timeout;

        let vector = bounded(limit, self.embedder.embed(question))
            .await
            .map_err(|e| QueryError::EmbeddingUnavailable(e.to_string()))?;
        if vector.is_empty() {
            return Err(QueryError::EmbeddingUnavailable(
                "provider returned an empty vector".to_string(),
            ));
        }

        let query = VectorQuery::new(vector, TOP_K, OwnerFilter::new(owner));
        let matches = bounded(limit, self.index.query(&query))
            .await
            .map_err(|e| QueryError::IndexUnavailable(e.to_string()))?;
        let matches = self.apply_min_score(matches);
        debug!(matches = matches.len(), "Similarity search complete");

        let ids: Vec<NoteId> = matches.iter().map(|m| m.id.clone()).collect();
        let notes = if ids.is_empty() {
            Vec::new()
        } else {
            bounded(limit, self.store.find_by_ids(&ids, owner))
                .await
                .map_err(|e| QueryError::StoreUnavailable(e.to_string()))?
        };
        if notes.len() < ids.len() {
            warn!(
                dangling = ids.len() - notes.len(),
                "Ignoring matches with no stored note"
            );
        }

        let sources = rank::merge_and_rank(&matches, notes, owner);

        let built = build_answer_prompt(
            &self.prompt,
            question,
            &rank::excerpts(&sources),
            self.settings.max_excerpt_chars,
        )
        .map_err(|e| QueryError::CompletionUnavailable(format!("prompt assembly failed: {}", e)))?;
        debug!(
            prompt_id = %built.metadata.source_prompt_id,
            excerpts = built.metadata.excerpt_count,
            truncated = built.metadata.truncated_excerpts,
            "Prompt assembled"
        );

        let mut request = LlmRequest::new(built.user, self.settings.model.clone());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = self.settings.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = bounded(limit, self.llm.complete(&request))
            .await
            .map_err(|e| QueryError::CompletionUnavailable(e.to_string()))?;

        info!(
            sources = sources.len(),
            provider = self.llm.provider_name(),
            "Answered question"
        );

        Ok(RagResponse {
            query: query_text.to_string(),
            answer: response.content,
            sources,
        })
    }

    fn apply_min_score(&self, matches: Vec<VectorMatch>) -> Vec<VectorMatch> {
        let Some(min) = self.settings.min_score else {
            return matches;
        };

        let before = matches.len();
        let kept: Vec<VectorMatch> = matches
            .into_iter()
            .filter(|m| m.score.unwrap_or(0.0) >= min)
            .collect();
        if kept.len() < before {
            debug!(
                discarded = before - kept.len(),
                min_score = min,
                "Discarded low-score matches"
            );
        }
        kept
    }
}
