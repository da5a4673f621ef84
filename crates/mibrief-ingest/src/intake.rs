//! Batch intake of externally produced cards.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use mibrief_core::{is_near_duplicate, validate, NewCard, RawCard, RejectionReason, ValidationReport};
use mibrief_db::{CardQuery, CardStore};

use crate::dedup::is_duplicate;
use crate::error::IngestError;
use crate::pipeline::{rejection, score_card};

/// Result of one intake batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeOutcome {
    pub stored: usize,
    pub rejected: usize,
    /// Validation issues and duplicate notes, each prefixed with the card's
    /// position in the batch and its title.
    pub issues: Vec<String>,
    pub card_ids: Vec<Uuid>,
}

fn label(index: usize, raw: &RawCard) -> String {
    format!("card {index} ({})", raw.title_text().unwrap_or("untitled"))
}

/// Validate, dedupe and store a batch of card candidates.
///
/// Invalid candidates go to the rejection log; duplicates are skipped and only
/// reported in the outcome. Accepted cards are written in one batch, so either
/// all of them are stored or none.
///
/// # Errors
///
/// Returns [`IngestError::Db`] if a store read or write fails.
pub async fn store_cards(
    store: &dyn CardStore,
    cards: &[Value],
    now: DateTime<Utc>,
) -> Result<IntakeOutcome, IngestError> {
    let mut outcome = IntakeOutcome::default();
    let mut accepted: Vec<NewCard> = Vec::new();

    for (index, value) in cards.iter().enumerate() {
        let raw = match value {
            Value::Object(_) => serde_json::from_value::<RawCard>(value.clone()).ok(),
            _ => None,
        };
        let Some(raw) = raw else {
            let issue = format!("card {index}: not a card object");
            let report = ValidationReport {
                is_valid: false,
                score: 0,
                issues: vec![issue.clone()],
                warnings: vec![],
            };
            let mut rejected = rejection(&RawCard::default(), &report, RejectionReason::Validation, now);
            rejected.payload = value.clone();
            store.add_rejected_card(&rejected).await?;
            outcome.rejected += 1;
            outcome.issues.push(issue);
            continue;
        };

        let report = validate(&raw);
        if !report.is_valid {
            tracing::info!(index, score = report.score, "intake card rejected by validation");
            store
                .add_rejected_card(&rejection(&raw, &report, RejectionReason::Validation, now))
                .await?;
            let prefix = label(index, &raw);
            outcome
                .issues
                .extend(report.issues.iter().map(|i| format!("{prefix}: {i}")));
            outcome.rejected += 1;
            continue;
        }

        let card = score_card(&raw, &report, now)?;

        let duplicate = if hash_exists(store, &accepted, &card.content_hash).await? {
            Some("identical card already stored")
        } else if accepted
            .iter()
            .any(|a| a.pillar == card.pillar && is_near_duplicate(&card.title, &a.title))
            || is_duplicate(store, &card.title, card.pillar, now).await
        {
            Some("duplicate of a recent card on the same topic")
        } else {
            None
        };

        if let Some(note) = duplicate {
            tracing::info!(index, title = %card.title, note, "intake card skipped as duplicate");
            outcome.issues.push(format!("{}: {note}", label(index, &raw)));
            outcome.rejected += 1;
            continue;
        }

        accepted.push(card);
    }

    if !accepted.is_empty() {
        let stored = store.add_cards(&accepted).await?;
        outcome.stored = stored.len();
        outcome.card_ids = stored.into_iter().map(|c| c.id).collect();
    }

    tracing::info!(
        received = cards.len(),
        stored = outcome.stored,
        rejected = outcome.rejected,
        "intake batch processed"
    );

    Ok(outcome)
}

async fn hash_exists(
    store: &dyn CardStore,
    batch: &[NewCard],
    hash: &str,
) -> Result<bool, IngestError> {
    if batch.iter().any(|c| c.content_hash == hash) {
        return Ok(true);
    }
    let existing = store
        .query_cards(&CardQuery::new().content_hash(hash).limit(1))
        .await?;
    Ok(!existing.is_empty())
}
