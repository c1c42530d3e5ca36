//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{OllamaProvider, OpenAiProvider, TrigramProvider};
use recall_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
///
/// Implementations reject empty input and never return a zero or
/// partial vector in place of an error.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }
}

/// Error unless every text has something to embed.
pub(crate) fn ensure_non_empty(texts: &[String]) -> AppResult<()> {
    if texts.iter().any(|t| t.trim().is_empty()) {
        return Err(AppError::InvalidInput(
            "Cannot embed empty text".to_string(),
        ));
    }
    Ok(())
}

/// Error unless `vector` has the configured length.
pub(crate) fn ensure_dimensions(vector: &[f32], expected: usize) -> AppResult<()> {
    if vector.len() != expected {
        return Err(AppError::Llm(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            expected,
            vector.len()
        )));
    }
    Ok(())
}

/// Create an embedding provider based on configuration.
///
/// `timeout` bounds each HTTP request of network providers.
pub fn create_provider(
    config: &EmbeddingConfig,
    timeout: Duration,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    match config.provider.as_str() {
        "trigram" | "mock" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config, timeout)?)),

        "openai" => {
            let key_env = config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
            let api_key = std::env::var(key_env).map_err(|_| {
                AppError::Config(format!(
                    "Embedding provider 'openai' needs an API key in ${}",
                    key_env
                ))
            })?;
            Ok(Arc::new(OpenAiProvider::new(config, &api_key, timeout)?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: trigram, ollama, openai",
            config.provider
        ))),
    }
}
