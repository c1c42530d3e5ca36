//! Test doubles for the embedding, index, store and completion seams.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use crate::index::SqliteVectorIndex;
use crate::rag::{PipelineSettings, RecallPipeline};
use crate::service::NoteService;
use crate::store::{NoteStore, SqliteNoteStore};
use crate::sync::NoteIndexer;
use crate::types::{NewNote, Note, NoteId, NotePage, NoteUpdate, OwnerId, Page};
use crate::vector_index::{OwnerFilter, VectorIndex, VectorMatch, VectorQuery, VectorRecord};
use async_trait::async_trait;
use recall_core::{AppError, AppResult};
use recall_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use recall_prompt::default_answer_prompt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

pub const CALL_TIMEOUT: Duration = Duration::from_millis(200);

pub fn owner(id: &str) -> OwnerId {
    OwnerId::parse(id).unwrap()
}

/// Sleep far past [`CALL_TIMEOUT`].
async fn stall() {
    tokio::time::sleep(CALL_TIMEOUT * 20).await;
}

/// Trigram embedder that can be switched into failing or hanging.
#[derive(Debug)]
pub struct FlakyEmbedder {
    inner: TrigramProvider,
    pub fail: AtomicBool,
    pub stall: AtomicBool,
}

impl FlakyEmbedder {
    pub fn new() -> Self {
        Self {
            inner: TrigramProvider::new(EmbeddingConfig::default().dimensions),
            fail: AtomicBool::new(false),
            stall: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if self.stall.load(Ordering::SeqCst) {
            stall().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Llm("embedding quota exceeded".to_string()));
        }
        self.inner.embed_batch(texts).await
    }
}

/// SQLite index with switchable faults.
pub struct FlakyIndex {
    inner: SqliteVectorIndex,
    pub fail_upsert: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_query: AtomicBool,
    pub stall_query: AtomicBool,
}

impl FlakyIndex {
    pub fn new() -> Self {
        Self {
            inner: SqliteVectorIndex::open_in_memory(&EmbeddingConfig::default()).unwrap(),
            fail_upsert: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_query: AtomicBool::new(false),
            stall_query: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn upsert(&self, record: VectorRecord) -> AppResult<()> {
        if self.fail_upsert.load(Ordering::SeqCst) {
            return Err(AppError::Index("upsert rejected".to_string()));
        }
        self.inner.upsert(record).await
    }

    async fn delete(&self, id: &NoteId) -> AppResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Index("delete rejected".to_string()));
        }
        self.inner.delete(id).await
    }

    async fn query(&self, query: &VectorQuery) -> AppResult<Vec<VectorMatch>> {
        if self.stall_query.load(Ordering::SeqCst) {
            stall().await;
        }
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(AppError::Index("query rejected".to_string()));
        }
        self.inner.query(query).await
    }

    async fn ids(&self, filter: &OwnerFilter) -> AppResult<Vec<NoteId>> {
        self.inner.ids(filter).await
    }
}

/// Index that ignores the owner filter and returns fixed hits.
pub struct LeakyIndex {
    pub hits: Vec<VectorMatch>,
}

#[async_trait]
impl VectorIndex for LeakyIndex {
    async fn upsert(&self, _record: VectorRecord) -> AppResult<()> {
        Ok(())
    }

    async fn delete(&self, _id: &NoteId) -> AppResult<()> {
        Ok(())
    }

    async fn query(&self, query: &VectorQuery) -> AppResult<Vec<VectorMatch>> {
        Ok(self.hits.iter().take(query.top_k).cloned().collect())
    }

    async fn ids(&self, _filter: &OwnerFilter) -> AppResult<Vec<NoteId>> {
        Ok(self.hits.iter().map(|h| h.id.clone()).collect())
    }
}

/// Store whose hydrate ignores the owner, for checking the ranking
/// step's own owner check.
pub struct LeakyStore {
    pub inner: Arc<SqliteNoteStore>,
    pub owners: Vec<OwnerId>,
}

#[async_trait]
impl NoteStore for LeakyStore {
    async fn insert(&self, note: NewNote) -> AppResult<Note> {
        self.inner.insert(note).await
    }

    async fn get(&self, id: &NoteId, owner: &OwnerId) -> AppResult<Option<Note>> {
        self.inner.get(id, owner).await
    }

    async fn find_by_ids(&self, ids: &[NoteId], _owner: &OwnerId) -> AppResult<Vec<Note>> {
        let mut notes = Vec::new();
        for owner in &self.owners {
            notes.extend(self.inner.find_by_ids(ids, owner).await?);
        }
        Ok(notes)
    }

    async fn list(&self, owner: &OwnerId, page: Page) -> AppResult<NotePage> {
        self.inner.list(owner, page).await
    }

    async fn list_all(&self, owner: &OwnerId) -> AppResult<Vec<Note>> {
        self.inner.list_all(owner).await
    }

    async fn update(&self, id: &NoteId, owner: &OwnerId, update: NoteUpdate) -> AppResult<Option<Note>> {
        self.inner.update(id, owner, update).await
    }

    async fn delete(&self, id: &NoteId, owner: &OwnerId) -> AppResult<bool> {
        self.inner.delete(id, owner).await
    }

    async fn count(&self, owner: &OwnerId) -> AppResult<u64> {
        self.inner.count(owner).await
    }

    async fn owners(&self) -> AppResult<Vec<OwnerId>> {
        self.inner.owners().await
    }
}

/// Store whose hydrate never answers in time.
pub struct SlowStore {
    pub inner: Arc<SqliteNoteStore>,
}

#[async_trait]
impl NoteStore for SlowStore {
    async fn insert(&self, note: NewNote) -> AppResult<Note> {
        self.inner.insert(note).await
    }

    async fn get(&self, id: &NoteId, owner: &OwnerId) -> AppResult<Option<Note>> {
        self.inner.get(id, owner).await
    }

    async fn find_by_ids(&self, ids: &[NoteId], owner: &OwnerId) -> AppResult<Vec<Note>> {
        stall().await;
        self.inner.find_by_ids(ids, owner).await
    }

    async fn list(&self, owner: &OwnerId, page: Page) -> AppResult<NotePage> {
        self.inner.list(owner, page).await
    }

    async fn list_all(&self, owner: &OwnerId) -> AppResult<Vec<Note>> {
        self.inner.list_all(owner).await
    }

    async fn update(&self, id: &NoteId, owner: &OwnerId, update: NoteUpdate) -> AppResult<Option<Note>> {
        self.inner.update(id, owner, update).await
    }

    async fn delete(&self, id: &NoteId, owner: &OwnerId) -> AppResult<bool> {
        self.inner.delete(id, owner).await
    }

    async fn count(&self, owner: &OwnerId) -> AppResult<u64> {
        self.inner.count(owner).await
    }

    async fn owners(&self) -> AppResult<Vec<OwnerId>> {
        self.inner.owners().await
    }
}

/// Store that is always down.
pub struct DownStore;

#[async_trait]
impl NoteStore for DownStore {
    async fn insert(&self, _note: NewNote) -> AppResult<Note> {
        Err(down())
    }

    async fn get(&self, _id: &NoteId, _owner: &OwnerId) -> AppResult<Option<Note>> {
        Err(down())
    }

    async fn find_by_ids(&self, _ids: &[NoteId], _owner: &OwnerId) -> AppResult<Vec<Note>> {
        Err(down())
    }

    async fn list(&self, _owner: &OwnerId, _page: Page) -> AppResult<NotePage> {
        Err(down())
    }

    async fn list_all(&self, _owner: &OwnerId) -> AppResult<Vec<Note>> {
        Err(down())
    }

    async fn update(&self, _id: &NoteId, _owner: &OwnerId, _update: NoteUpdate) -> AppResult<Option<Note>> {
        Err(down())
    }

    async fn delete(&self, _id: &NoteId, _owner: &OwnerId) -> AppResult<bool> {
        Err(down())
    }

    async fn count(&self, _owner: &OwnerId) -> AppResult<u64> {
        Err(down())
    }

    async fn owners(&self) -> AppResult<Vec<OwnerId>> {
        Err(down())
    }
}

fn down() -> AppError {
    AppError::Store("connection refused".to_string())
}

/// Completion client that answers with the prompt it was given, so tests
/// can see exactly what the model would have seen.
#[derive(Default)]
pub struct EchoLlm {
    pub fail: AtomicBool,
    pub stall: AtomicBool,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl EchoLlm {
    pub fn last_prompt(&self) -> String {
        self.requests
            .lock()
            .unwrap()
            .last()
            .map(|r| r.prompt.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for EchoLlm {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if self.stall.load(Ordering::SeqCst) {
            stall().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Llm("model overloaded".to_string()));
        }
        Ok(LlmResponse {
            content: request.prompt.clone(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}

/// A store, a faultable index and embedder, and an echoing model, wired
/// together the way a workspace wires the real ones.
pub struct Harness {
    pub store: Arc<SqliteNoteStore>,
    pub index: Arc<FlakyIndex>,
    pub embedder: Arc<FlakyEmbedder>,
    pub llm: Arc<EchoLlm>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(SqliteNoteStore::open_in_memory().unwrap()),
            index: Arc::new(FlakyIndex::new()),
            embedder: Arc::new(FlakyEmbedder::new()),
            llm: Arc::new(EchoLlm::default()),
        }
    }

    pub fn service(&self) -> NoteService {
        let indexer = NoteIndexer::new(self.embedder.clone(), self.index.clone(), CALL_TIMEOUT);
        NoteService::new(self.store.clone(), indexer)
    }

    pub fn pipeline(&self) -> RecallPipeline {
        self.pipeline_with(self.index.clone(), self.store.clone())
    }

    pub fn pipeline_with(&self, index: Arc<dyn VectorIndex>, store: Arc<dyn NoteStore>) -> RecallPipeline {
        RecallPipeline::new(
            self.embedder.clone(),
            index,
            store,
            self.llm.clone(),
            default_answer_prompt().unwrap(),
            settings(),
        )
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        model: "test-model".to_string(),
        call_timeout: CALL_TIMEOUT,
        min_score: None,
        max_excerpt_chars: 600,
        max_question_chars: 500,
        temperature: Some(0.7),
        max_tokens: None,
    }
}

/// Collects formatted log lines written by a test subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
