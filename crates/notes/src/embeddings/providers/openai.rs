//! OpenAI-compatible embedding provider (`POST {base}/embeddings`).

use crate::embeddings::provider::{ensure_dimensions, ensure_non_empty, EmbeddingProvider};
use crate::embeddings::EmbeddingConfig;
use async_trait::async_trait;
use recall_core::{AppError, AppResult};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: &str, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Llm(format!("Failed to create HTTP client for OpenAI: {}", e))
        })?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

/// Extract `data[].embedding` in input order, honouring each item's
/// `index` when present.
fn parse_embedding_response(json: Value) -> AppResult<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Llm("Embedding response is missing data array".to_string()))?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(position);
        let values = item
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| AppError::Llm("Embedding item missing embedding array".to_string()))?;

        let vector = values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|n| n as f32)
                    .ok_or_else(|| AppError::Llm("Embedding value must be numeric".to_string()))
            })
            .collect::<AppResult<Vec<f32>>>()?;
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        ensure_non_empty(texts)?;

        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({ "model": self.model, "input": texts });
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "OpenAI embeddings error ({}): {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let vectors = parse_embedding_response(json)?;
        if vectors.len() != texts.len() {
            return Err(AppError::Llm(format!(
                "Embedding count mismatch: sent {}, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            ensure_dimensions(vector, self.dimensions)?;
        }
        Ok(vectors)
    }
}
