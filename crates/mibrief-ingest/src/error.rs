use thiserror::Error;
use uuid::Uuid;

use mibrief_core::{ConfigError, CoreError};
use mibrief_db::DbError;
use mibrief_llm::LlmError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("store error: {0}")]
    Db(#[from] DbError),

    #[error("card error: {0}")]
    Core(#[from] CoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM output is not a card: {0}")]
    MalformedOutput(String),

    #[error("slot timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("card {0} not found")]
    CardNotFound(Uuid),
}

/// Why the publishing selector found nothing to post.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("no cards published in the last 24 hours")]
    NoCardsInWindow,

    #[error("every recent card has already been posted")]
    AllPosted,

    #[error("store error: {0}")]
    Db(#[from] DbError),
}

impl SelectError {
    /// Stable machine-readable reason.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            SelectError::NoCardsInWindow => "no_cards_in_window",
            SelectError::AllPosted => "all_posted",
            SelectError::Db(_) => "internal_error",
        }
    }
}
