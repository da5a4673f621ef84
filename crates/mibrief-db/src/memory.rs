//! In-process store with the same semantics as [`crate::PgCardStore`], for
//! tests and database-less runs.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

use mibrief_core::{Card, NewCard, Pillar, RejectedCard};

use crate::store::{CardStore, RunLedger};
use crate::{CardOrder, CardQuery, DbError, IngestionRunRow, RunCounts};

#[derive(Debug, Default)]
struct Inner {
    cards: Vec<Card>,
    rejected: Vec<RejectedCard>,
    runs: Vec<IngestionRunRow>,
}

#[derive(Debug, Default)]
pub struct MemoryCardStore {
    inner: Mutex<Inner>,
}

impl MemoryCardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an already materialized card, bypassing hash checks.
    pub fn seed(&self, card: Card) {
        self.lock().cards.push(card);
    }

    /// Snapshot of every stored card in insertion order.
    #[must_use]
    pub fn cards(&self) -> Vec<Card> {
        self.lock().cards.clone()
    }

    /// Snapshot of the rejection log in insertion order.
    #[must_use]
    pub fn rejected(&self) -> Vec<RejectedCard> {
        self.lock().rejected.clone()
    }

    fn materialize(card: &NewCard) -> Card {
        Card::from_new(card.clone(), Uuid::new_v4(), Utc::now())
    }
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn add_card(&self, card: &NewCard) -> Result<Card, DbError> {
        let mut inner = self.lock();
        if inner
            .cards
            .iter()
            .any(|c| c.content_hash == card.content_hash)
        {
            return Err(DbError::DuplicateContentHash(card.content_hash.clone()));
        }
        let stored = Self::materialize(card);
        inner.cards.push(stored.clone());
        Ok(stored)
    }

    async fn add_cards(&self, cards: &[NewCard]) -> Result<Vec<Card>, DbError> {
        let mut inner = self.lock();
        let mut hashes: HashSet<&str> = inner
            .cards
            .iter()
            .map(|c| c.content_hash.as_str())
            .collect();
        for card in cards {
            if !hashes.insert(card.content_hash.as_str()) {
                return Err(DbError::DuplicateContentHash(card.content_hash.clone()));
            }
        }

        let stored: Vec<Card> = cards.iter().map(Self::materialize).collect();
        inner.cards.extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn query_cards(&self, query: &CardQuery) -> Result<Vec<Card>, DbError> {
        let inner = self.lock();
        let mut matched: Vec<Card> = inner
            .cards
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();

        match query.order {
            CardOrder::PublishedDesc => matched.sort_by(|a, b| {
                b.published_at
                    .cmp(&a.published_at)
                    .then(b.created_at.cmp(&a.created_at))
            }),
            CardOrder::PublishedThenPriorityDesc => matched.sort_by(|a, b| {
                b.published_at
                    .cmp(&a.published_at)
                    .then(b.priority.cmp(&a.priority))
            }),
        }

        if let Some(limit) = query.limit {
            matched.truncate(usize::try_from(limit).unwrap_or(0));
        }

        Ok(matched)
    }

    async fn get_card(&self, id: Uuid) -> Result<Option<Card>, DbError> {
        Ok(self.lock().cards.iter().find(|c| c.id == id).cloned())
    }

    async fn mark_card_posted(
        &self,
        id: Uuid,
        post_url: Option<&str>,
        posted_at: DateTime<Utc>,
    ) -> Result<Card, DbError> {
        let mut inner = self.lock();
        let card = inner
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(DbError::NotFound)?;
        card.linkedin_posted = true;
        card.linkedin_posted_at = Some(posted_at);
        card.linkedin_post_url = post_url.map(str::to_string);
        Ok(card.clone())
    }

    async fn add_rejected_card(&self, card: &RejectedCard) -> Result<(), DbError> {
        self.lock().rejected.push(card.clone());
        Ok(())
    }
}

#[async_trait]
impl RunLedger for MemoryCardStore {
    async fn create_run(
        &self,
        trigger_source: &str,
        pillar: Option<Pillar>,
    ) -> Result<IngestionRunRow, DbError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let id = i64::try_from(inner.runs.len()).unwrap_or(i64::MAX) + 1;
        let row = IngestionRunRow {
            id,
            public_id: Uuid::new_v4(),
            trigger_source: trigger_source.to_string(),
            pillar: pillar.map(|p| p.as_str().to_string()),
            status: "running".to_string(),
            started_at: now,
            completed_at: None,
            slots_attempted: 0,
            cards_stored: 0,
            rejected_validation: 0,
            rejected_duplicate: 0,
            failed: 0,
            usage: Json(Value::Object(serde_json::Map::new())),
            error_message: None,
            created_at: now,
        };
        inner.runs.push(row.clone());
        Ok(row)
    }

    async fn complete_run(&self, id: i64, counts: &RunCounts) -> Result<(), DbError> {
        let mut inner = self.lock();
        let run = running_run(&mut inner, id)?;
        run.status = "succeeded".to_string();
        run.completed_at = Some(Utc::now());
        run.slots_attempted = counts.slots_attempted;
        run.cards_stored = counts.cards_stored;
        run.rejected_validation = counts.rejected_validation;
        run.rejected_duplicate = counts.rejected_duplicate;
        run.failed = counts.failed;
        run.usage = Json(counts.usage.clone());
        Ok(())
    }

    async fn fail_run(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        let mut inner = self.lock();
        let run = running_run(&mut inner, id)?;
        run.status = "failed".to_string();
        run.completed_at = Some(Utc::now());
        run.error_message = Some(error_message.to_string());
        Ok(())
    }

    async fn list_runs(&self, limit: i64) -> Result<Vec<IngestionRunRow>, DbError> {
        let inner = self.lock();
        Ok(inner
            .runs
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

fn running_run(inner: &mut Inner, id: i64) -> Result<&mut IngestionRunRow, DbError> {
    inner
        .runs
        .iter_mut()
        .find(|r| r.id == id && r.status == "running")
        .ok_or(DbError::InvalidIngestionRunTransition {
            id,
            expected_status: "running",
        })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use mibrief_core::CardType;

    use super::*;

    fn new_card(title: &str, pillar: Pillar, published_at: DateTime<Utc>) -> NewCard {
        NewCard {
            title: title.to_string(),
            summary: "A summary long enough to be stored by the test store.".to_string(),
            signals: vec!["one".to_string(), "two".to_string()],
            moves: vec!["Your next move: act".to_string(), "then act".to_string()],
            pillar,
            card_type: CardType::Brief,
            source: "Reuters".to_string(),
            source_tier: 1,
            source_count: Some(4),
            priority: 80,
            validation_score: 95,
            content_hash: mibrief_core::content_hash(title, "summary"),
            published_at,
        }
    }

    #[tokio::test]
    async fn add_card_rejects_duplicate_hash() {
        let store = MemoryCardStore::new();
        let card = new_card("Same title", Pillar::AiStrategy, Utc::now());
        store.add_card(&card).await.unwrap();
        let err = store.add_card(&card).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateContentHash(_)));
        assert_eq!(store.cards().len(), 1);
    }

    #[tokio::test]
    async fn add_cards_is_all_or_nothing() {
        let store = MemoryCardStore::new();
        let now = Utc::now();
        let a = new_card("First", Pillar::AiStrategy, now);
        let b = new_card("Second", Pillar::AiStrategy, now);
        let err = store
            .add_cards(&[a.clone(), b, a])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateContentHash(_)));
        assert!(store.cards().is_empty());
    }

    #[tokio::test]
    async fn query_orders_newest_first_and_limits() {
        let store = MemoryCardStore::new();
        let now = Utc::now();
        for (i, title) in ["old", "newest", "middle"].iter().enumerate() {
            let offset = match i {
                0 => 10,
                1 => 0,
                _ => 5,
            };
            store
                .add_card(&new_card(title, Pillar::MediaTrends, now - Duration::hours(offset)))
                .await
                .unwrap();
        }

        let cards = store
            .query_cards(&CardQuery::new().pillar(Pillar::MediaTrends).limit(2))
            .await
            .unwrap();
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle"]);
    }

    #[tokio::test]
    async fn priority_breaks_timestamp_ties() {
        let store = MemoryCardStore::new();
        let now = Utc::now();
        let mut low = new_card("low", Pillar::AiStrategy, now);
        low.priority = 60;
        let mut high = new_card("high", Pillar::AiStrategy, now);
        high.priority = 95;
        store.add_cards(&[low, high]).await.unwrap();

        let cards = store
            .query_cards(&CardQuery::new().order(CardOrder::PublishedThenPriorityDesc))
            .await
            .unwrap();
        assert_eq!(cards[0].title, "high");
    }

    #[tokio::test]
    async fn mark_posted_updates_state_and_unknown_is_not_found() {
        let store = MemoryCardStore::new();
        let stored = store
            .add_card(&new_card("x", Pillar::AiStrategy, Utc::now()))
            .await
            .unwrap();
        let at = Utc::now();
        let updated = store
            .mark_card_posted(stored.id, Some("https://linkedin.com/p/1"), at)
            .await
            .unwrap();
        assert!(updated.linkedin_posted);
        assert_eq!(updated.linkedin_posted_at, Some(at));
        assert_eq!(
            updated.linkedin_post_url.as_deref(),
            Some("https://linkedin.com/p/1")
        );

        let err = store
            .mark_card_posted(Uuid::new_v4(), None, at)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[tokio::test]
    async fn run_lifecycle() {
        let store = MemoryCardStore::new();
        let run = store.create_run("cli", None).await.unwrap();
        assert_eq!(run.status, "running");

        let counts = RunCounts {
            slots_attempted: 3,
            cards_stored: 2,
            ..RunCounts::default()
        };
        store.complete_run(run.id, &counts).await.unwrap();
        let err = store.fail_run(run.id, "late").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidIngestionRunTransition { expected_status: "running", .. }
        ));

        let runs = store.list_runs(10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, "succeeded");
        assert_eq!(runs[0].cards_stored, 2);
    }
}
