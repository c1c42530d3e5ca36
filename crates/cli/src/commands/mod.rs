//! Command handlers for the recall CLI.

pub mod ask;
pub mod note;
pub mod resync;
pub mod stats;

pub use ask::AskCommand;
pub use note::NoteCommand;
pub use resync::ResyncCommand;
pub use stats::StatsCommand;

use recall_core::{config::AppConfig, AppError, AppResult};
use recall_notes::OwnerId;
use serde::Serialize;

/// Resolve the caller's identity. Every command that touches notes calls
/// this before anything else.
pub fn authenticate(config: &AppConfig) -> AppResult<OwnerId> {
    match config.user.as_deref() {
        Some(user) => OwnerId::parse(user),
        None => Err(AppError::Unauthenticated(
            "no user given; pass --user or set RECALL_USER".to_string(),
        )),
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_user_is_unauthenticated() {
        let config = AppConfig {
            user: None,
            ..AppConfig::default()
        };
        assert!(matches!(authenticate(&config), Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_blank_user_is_unauthenticated() {
        let config = AppConfig {
            user: Some("   ".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(authenticate(&config), Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_user_becomes_owner() {
        let config = AppConfig {
            user: Some("u1".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(authenticate(&config).unwrap().as_str(), "u1");
    }
}
