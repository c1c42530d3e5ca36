//! Notes configuration and storage locations.
//!
//! Loaded from `<workspace>/.recall/notes.yaml`; every section falls back to
//! defaults when absent.

use crate::embeddings::EmbeddingConfig;
use recall_core::{AppError, AppResult};
use recall_prompt::DEFAULT_ANSWER_PROMPT_ID;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    /// Answer prompt to load (see `recall_prompt::load_prompt`)
    #[serde(default = "default_prompt_id")]
    pub prompt_id: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            completion: CompletionConfig::default(),
            prompt_id: default_prompt_id(),
        }
    }
}

fn default_prompt_id() -> String {
    DEFAULT_ANSWER_PROMPT_ID.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Matches scoring below this are discarded before hydration. Off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,

    /// Upper bound for every external call, in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Longest excerpt of a note placed in the prompt, in characters
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,

    /// Longest question placed in the prompt, in characters
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_score: None,
            call_timeout_secs: default_call_timeout_secs(),
            max_excerpt_chars: default_max_excerpt_chars(),
            max_question_chars: default_max_question_chars(),
        }
    }
}

impl RetrievalConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

fn default_call_timeout_secs() -> u64 {
    8
}

fn default_max_excerpt_chars() -> usize {
    600
}

fn default_max_question_chars() -> usize {
    500
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

impl NotesConfig {
    pub fn validate(&self) -> AppResult<()> {
        self.embedding.validate()?;

        if self.retrieval.call_timeout_secs == 0 {
            return Err(AppError::Config(
                "retrieval.call_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.max_excerpt_chars == 0 {
            return Err(AppError::Config(
                "retrieval.max_excerpt_chars must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.max_question_chars == 0 {
            return Err(AppError::Config(
                "retrieval.max_question_chars must be greater than 0".to_string(),
            ));
        }
        if let Some(min) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&min) {
                return Err(AppError::Config(format!(
                    "retrieval.min_score must be within [-1, 1], got {}",
                    min
                )));
            }
        }
        Ok(())
    }
}

/// Load notes configuration, using defaults when no file exists.
pub fn load_config(workspace: &Path) -> AppResult<NotesConfig> {
    let config_path = get_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!("No notes config at {:?}, using defaults", config_path);
        return Ok(NotesConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config: NotesConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.validate()?;
    tracing::debug!("Loaded notes config from {:?}", config_path);
    Ok(config)
}

/// Save notes configuration.
pub fn save_config(workspace: &Path, config: &NotesConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(config)?;
    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved notes config to {:?}", config_path);
    Ok(())
}

/// Get the `.recall` directory for a workspace.
pub fn get_recall_dir(workspace: &Path) -> PathBuf {
    workspace.join(".recall")
}

/// Get the notes config path.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    get_recall_dir(workspace).join("notes.yaml")
}

/// Get the document store path.
pub fn get_store_path(workspace: &Path) -> PathBuf {
    get_recall_dir(workspace).join("notes.sqlite")
}

/// Get the vector index path.
pub fn get_index_path(workspace: &Path) -> PathBuf {
    get_recall_dir(workspace).join("vectors.sqlite")
}
