pub mod app_config;
pub mod card;
pub mod config;
pub mod pillars;
pub mod priority;
pub mod topic;
pub mod validate;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use card::{
    content_hash, Card, CardType, NewCard, Pillar, RawCard, RejectedCard, RejectionReason,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use pillars::{load_pillars, parse_pillars, PillarConfig, PillarsFile};
pub use priority::{priority_score, priority_score_with};
pub use topic::{is_near_duplicate, primary_topic, title_similarity};
pub use validate::{validate, ValidationReport};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid pillar: {0}")]
    InvalidPillar(String),

    #[error("invalid card type: {0}")]
    InvalidCardType(String),

    #[error("card is missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read pillars file {path}: {source}")]
    PillarsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pillars file: {0}")]
    PillarsFileParse(#[source] serde_yaml::Error),

    #[error("pillar plan validation failed: {0}")]
    Validation(String),
}
