//! Prompt builder for the note answering prompt.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptExcerpt};
use handlebars::Handlebars;
use recall_core::{AppError, AppResult};
use serde::Serialize;

#[derive(Serialize)]
struct RenderedExcerpt<'a> {
    position: usize,
    content: &'a str,
    score: String,
}

#[derive(Serialize)]
struct AnswerContext<'a> {
    question: &'a str,
    notes: Vec<RenderedExcerpt<'a>>,
}

/// Build the answering prompt for `question` from ranked excerpts.
///
/// Excerpts are numbered from 1 in the order given, each shortened to at
/// most `max_excerpt_chars` characters, and rendered with their score.
///
/// # Example
/// ```no_run
/// use recall_prompt::{build_answer_prompt, default_answer_prompt, PromptExcerpt};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = default_answer_prompt()?;
/// let excerpts = vec![PromptExcerpt { content: "Dentist Friday 3pm".into(), score: 0.82 }];
/// let built = build_answer_prompt(&def, "when is my dentist appointment", &excerpts, 600)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_answer_prompt(
    definition: &PromptDefinition,
    question: &str,
    excerpts: &[PromptExcerpt],
    max_excerpt_chars: usize,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        prompt_id = %definition.id,
        excerpts = excerpts.len(),
        "Building answer prompt"
    );

    let mut truncated_excerpts = 0;
    let notes = excerpts
        .iter()
        .enumerate()
        .map(|(i, excerpt)| {
            let content = truncate_excerpt(excerpt.content.trim(), max_excerpt_chars);
            if content.len() < excerpt.content.trim().len() {
                truncated_excerpts += 1;
            }
            RenderedExcerpt {
                position: i + 1,
                content,
                score: format!("{:.3}", excerpt.score),
            }
        })
        .collect::<Vec<_>>();

    let excerpt_count = notes.len();
    let context = AnswerContext { question, notes };
    let user = render_template(&definition.template, &context)?;

    Ok(BuiltPrompt {
        system: definition.system.clone(),
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            excerpt_count,
            truncated_excerpts,
        },
    })
}

/// Render a Handlebars template with serializable data.
fn render_template<T: Serialize>(template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

/// Shorten `text` to at most `max_chars` characters, cutting at a word
/// boundary where one exists. Never splits a UTF-8 sequence.
pub fn truncate_excerpt(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };

    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => head[..last_space].trim_end(),
        _ => head,
    }
}
