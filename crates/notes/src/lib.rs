//! Personal notes with retrieval-augmented answering.
//!
//! Notes live in a SQLite document store. Each note's content is embedded
//! and kept in a per-owner vector index, which the query pipeline searches
//! to answer questions in the user's own words.

pub mod config;
pub mod embeddings;
pub mod index;
pub mod rag;
pub mod service;
pub mod store;
pub mod sync;
pub mod types;
pub mod vector_index;

mod deadline;

#[cfg(test)]
mod tests;

pub use config::NotesConfig;
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use index::SqliteVectorIndex;
pub use rag::{EnrichedResult, PipelineSettings, QueryError, QueryStage, RagResponse, RecallPipeline, TOP_K};
pub use service::{DeleteResult, NoteService, NoteStats, WriteResult};
pub use store::{NoteStore, SqliteNoteStore};
pub use sync::{IndexStatus, NoteIndexer, ResyncReport};
pub use types::{NewNote, Note, NoteId, NotePage, NoteUpdate, OwnerId, Page, Pagination};
pub use vector_index::{OwnerFilter, VectorIndex, VectorMatch, VectorMetadata, VectorQuery, VectorRecord};

use recall_core::AppResult;
use recall_llm::LlmClient;
use recall_prompt::PromptDefinition;
use std::path::Path;
use std::sync::Arc;

/// How to treat an existing vector index when opening a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Use it; fail if it was built with another embedding model.
    Open,
    /// Discard its contents first.
    Rebuild,
}

/// Store, index and embedder for one workspace.
pub struct NotesWorkspace {
    pub config: NotesConfig,
    pub store: Arc<dyn NoteStore>,
    pub index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl NotesWorkspace {
    /// Open the workspace's stores under `<workspace>/.recall`.
    pub fn open(workspace: &Path, mode: IndexMode) -> AppResult<Self> {
        let config = config::load_config(workspace)?;
        let store = SqliteNoteStore::open(&config::get_store_path(workspace))?;

        let index_path = config::get_index_path(workspace);
        let index = match mode {
            IndexMode::Open => SqliteVectorIndex::open(&index_path, &config.embedding)?,
            IndexMode::Rebuild => SqliteVectorIndex::open_rebuild(&index_path, &config.embedding)?,
        };

        let embedder = create_provider(&config.embedding, config.retrieval.call_timeout())?;

        tracing::debug!(
            provider = embedder.provider_name(),
            model = embedder.model_name(),
            dimensions = embedder.dimensions(),
            "Opened notes workspace"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
            index: Arc::new(index),
            embedder,
        })
    }

    pub fn indexer(&self) -> NoteIndexer {
        NoteIndexer::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            self.config.retrieval.call_timeout(),
        )
    }

    pub fn service(&self) -> NoteService {
        NoteService::new(Arc::clone(&self.store), self.indexer())
    }

    /// Query pipeline answering with `llm` and completion model `model`.
    pub fn pipeline(
        &self,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        model: &str,
    ) -> RecallPipeline {
        RecallPipeline::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.index),
            Arc::clone(&self.store),
            llm,
            prompt,
            PipelineSettings::from_config(&self.config, model),
        )
    }
}
