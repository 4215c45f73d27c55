use async_trait::async_trait;
use thiserror::Error;

use crate::models::{BracketError, BracketSet};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Tax data provider returned status {0}")]
    Status(u16),

    #[error("Could not decode tax data response: {0}")]
    Decode(String),

    #[error("No tax brackets available for year {0}")]
    NoBrackets(i32),

    #[error("Tax bracket data failed validation: {0}")]
    InvalidBrackets(#[from] BracketError),

    #[error("Bracket fetch task failed: {0}")]
    Task(String),
}

impl SourceError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(status) => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Provider of tax bracket schedules, one per tax year.
///
/// Implementations return an already validated [`BracketSet`]; a schedule
/// that fails validation is reported as [`SourceError::InvalidBrackets`].
#[async_trait]
pub trait BracketSource: Send + Sync {
    async fn fetch_brackets(&self, year: i32) -> Result<BracketSet, SourceError>;
}
