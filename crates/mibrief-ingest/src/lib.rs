//! Card ingestion for mibrief.
//!
//! Runs the LLM search-and-summarize pipeline over the pillar plan, takes in
//! cards pushed by external automation, and selects and acknowledges cards
//! for publishing. Every store access goes through [`mibrief_db::CardStore`].

pub mod context;
pub mod dedup;
pub mod error;
pub mod intake;
pub mod parse;
pub mod pipeline;
pub mod prompts;
pub mod publish;
pub mod types;

pub use context::{CallKind, RunContext};
pub use dedup::{find_duplicate, is_duplicate, DEDUP_SCAN_LIMIT, DEDUP_WINDOW_DAYS};
pub use error::{IngestError, SelectError};
pub use intake::{store_cards, IntakeOutcome};
pub use parse::parse_card_json;
pub use pipeline::{run_ingestion, run_recorded};
pub use publish::{mark_published, top_unpublished};
pub use types::{IngestConfig, RunSummary, SlotFailure};
