//! Prompt system for Recall.
//!
//! - YAML prompt definitions, with a built-in answering prompt
//! - Handlebars rendering of the question and retrieved excerpts

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::{build_answer_prompt, truncate_excerpt};
pub use loader::{default_answer_prompt, load_prompt, DEFAULT_ANSWER_PROMPT_ID};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptExcerpt,
    PromptOutputSpec,
};
