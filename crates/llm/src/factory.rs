//! Completion provider factory.
//!
//! Turns a provider name from configuration into a ready client.

use crate::client::LlmClient;
use crate::providers::{ollama, openai, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Create a completion client for `provider`.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by hosted providers
/// * `timeout` - Per-request timeout
///
/// # Errors
/// Returns an error message if the provider is unknown, a required secret
/// is missing, or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    match ProviderType::parse(provider) {
        Some(ProviderType::Ollama) => {
            let base_url = endpoint.unwrap_or(ollama::DEFAULT_OLLAMA_URL);
            let client = OllamaClient::new(base_url, timeout).map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        Some(ProviderType::OpenAI) => {
            let api_key = api_key.ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            let base_url = endpoint.unwrap_or(openai::DEFAULT_OPENAI_URL);
            let client =
                OpenAiClient::new(base_url, api_key, timeout).map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        None => Err(format!("Unknown provider: {}", provider)),
    }
}
