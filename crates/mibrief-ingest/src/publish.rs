//! Publishing selector and publish acknowledgement.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use mibrief_core::Card;
use mibrief_db::{CardOrder, CardQuery, CardStore, DbError};

use crate::error::{IngestError, SelectError};

pub const SELECT_WINDOW_HOURS: i64 = 24;
pub const SELECT_SCAN_LIMIT: i64 = 10;

/// The newest, highest-priority card of the last 24 hours that has not been
/// posted yet.
///
/// # Errors
///
/// [`SelectError::NoCardsInWindow`] when nothing was published in the window,
/// [`SelectError::AllPosted`] when every candidate was already posted.
pub async fn top_unpublished(store: &dyn CardStore, now: DateTime<Utc>) -> Result<Card, SelectError> {
    let query = CardQuery::new()
        .published_since(now - Duration::hours(SELECT_WINDOW_HOURS))
        .order(CardOrder::PublishedThenPriorityDesc)
        .limit(SELECT_SCAN_LIMIT);

    let candidates = store.query_cards(&query).await?;
    if candidates.is_empty() {
        return Err(SelectError::NoCardsInWindow);
    }

    candidates
        .into_iter()
        .find(|c| !c.linkedin_posted)
        .ok_or(SelectError::AllPosted)
}

/// Record that a card was posted.
///
/// # Errors
///
/// [`IngestError::CardNotFound`] for an unknown id, [`IngestError::Db`] for
/// store failures.
pub async fn mark_published(
    store: &dyn CardStore,
    id: Uuid,
    post_url: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Card, IngestError> {
    match store.mark_card_posted(id, post_url, now).await {
        Ok(card) => {
            tracing::info!(card_id = %id, post_url, "card marked as posted");
            Ok(card)
        }
        Err(DbError::NotFound) => Err(IngestError::CardNotFound(id)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use mibrief_core::{CardType, NewCard, Pillar};
    use mibrief_db::MemoryCardStore;

    use super::*;

    fn card(title: &str, priority: i16, published_at: DateTime<Utc>) -> Card {
        let new = NewCard {
            title: title.to_string(),
            summary: "summary".to_string(),
            signals: vec![],
            moves: vec![],
            pillar: Pillar::AiStrategy,
            card_type: CardType::Brief,
            source: "Reuters".to_string(),
            source_tier: 1,
            source_count: None,
            priority,
            validation_score: 100,
            content_hash: mibrief_core::content_hash(title, "summary"),
            published_at,
        };
        Card::from_new(new, Uuid::new_v4(), published_at)
    }

    #[tokio::test]
    async fn empty_window_is_distinct_from_all_posted() {
        let now = Utc::now();
        let store = MemoryCardStore::new();
        store.seed(card("old news", 90, now - Duration::hours(30)));

        let err = top_unpublished(&store, now).await.unwrap_err();
        assert!(matches!(err, SelectError::NoCardsInWindow));
        assert_eq!(err.code(), "no_cards_in_window");

        let mut posted = card("posted", 90, now - Duration::hours(1));
        posted.linkedin_posted = true;
        store.seed(posted);

        let err = top_unpublished(&store, now).await.unwrap_err();
        assert!(matches!(err, SelectError::AllPosted));
    }

    #[tokio::test]
    async fn picks_newest_then_highest_priority_unposted() {
        let now = Utc::now();
        let t = now - Duration::hours(2);
        let store = MemoryCardStore::new();
        store.seed(card("older", 99, now - Duration::hours(5)));
        store.seed(card("low", 60, t));
        store.seed(card("high", 95, t));
        let mut newest = card("newest but posted", 80, now - Duration::minutes(10));
        newest.linkedin_posted = true;
        store.seed(newest);

        let top = top_unpublished(&store, now).await.expect("a card");
        assert_eq!(top.title, "high");
    }

    #[tokio::test]
    async fn mark_published_sets_state() {
        let now = Utc::now();
        let store = MemoryCardStore::new();
        let seeded = card("to post", 80, now);
        let id = seeded.id;
        store.seed(seeded);

        let card = mark_published(&store, id, Some("https://linkedin.com/p/1"), now)
            .await
            .expect("marked");
        assert!(card.linkedin_posted);
        assert_eq!(card.linkedin_posted_at, Some(now));
        assert_eq!(card.linkedin_post_url.as_deref(), Some("https://linkedin.com/p/1"));

        let err = top_unpublished(&store, now).await.unwrap_err();
        assert!(matches!(err, SelectError::AllPosted));
    }

    #[tokio::test]
    async fn mark_published_unknown_id() {
        let store = MemoryCardStore::new();
        let id = Uuid::new_v4();
        let err = mark_published(&store, id, None, Utc::now()).await.unwrap_err();
        assert!(matches!(err, IngestError::CardNotFound(missing) if missing == id));
    }
}
