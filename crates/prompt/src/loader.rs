//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use recall_core::{AppError, AppResult};
use std::path::Path;

/// Id of the built-in answering prompt.
pub const DEFAULT_ANSWER_PROMPT_ID: &str = "notes.answer.default";

const DEFAULT_ANSWER_PROMPT_YAML: &str = include_str!("../prompts/notes.answer.default.yml");

/// The answering prompt compiled into the binary.
pub fn default_answer_prompt() -> AppResult<PromptDefinition> {
    parse_prompt(DEFAULT_ANSWER_PROMPT_YAML, "built-in prompt")
}

/// Load a prompt definition by id.
///
/// Looks for `<workspace>/.recall/prompts/<id>.yml` first. When no such
/// file exists and `prompt_id` names the built-in answering prompt, the
/// compiled-in definition is returned.
///
/// # Example
/// ```no_run
/// use recall_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "notes.answer.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = workspace_path
        .join(".recall/prompts")
        .join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        if prompt_id == DEFAULT_ANSWER_PROMPT_ID {
            tracing::debug!("Using built-in prompt: {}", prompt_id);
            return default_answer_prompt();
        }
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;

    if definition.id != prompt_id {
        tracing::warn!(
            "Prompt file {:?} declares id '{}' (expected '{}')",
            prompt_file,
            definition.id,
            prompt_id
        );
    }

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);
    Ok(definition)
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition has the fields the answering path relies on.
fn validate_prompt(definition: &PromptDefinition) -> AppResult<()> {
    if definition.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if definition.template.trim().is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' has an empty template",
            definition.id
        )));
    }

    if !definition.template.contains("{{question}}") {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' must reference {{{{question}}}}",
            definition.id
        )));
    }

    Ok(())
}
