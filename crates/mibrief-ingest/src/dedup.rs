//! Write-time near-duplicate check against recent cards of the same pillar.

use chrono::{DateTime, Duration, Utc};

use mibrief_core::{is_near_duplicate, Card, Pillar};
use mibrief_db::{CardOrder, CardQuery, CardStore};

/// How far back a recent card can make a candidate a duplicate.
pub const DEDUP_WINDOW_DAYS: i64 = 7;
/// Maximum number of recent same-pillar cards compared.
pub const DEDUP_SCAN_LIMIT: i64 = 50;

/// First card in `recent` published inside the window whose title
/// near-duplicates `title`.
#[must_use]
pub fn find_duplicate<'a>(title: &str, recent: &'a [Card], now: DateTime<Utc>) -> Option<&'a Card> {
    let since = now - Duration::days(DEDUP_WINDOW_DAYS);
    recent
        .iter()
        .filter(|c| c.published_at >= since)
        .find(|c| is_near_duplicate(title, &c.title))
}

/// Whether `title` repeats a card published in the last week for `pillar`.
///
/// Store failures are logged and treated as "not a duplicate".
pub async fn is_duplicate(
    store: &dyn CardStore,
    title: &str,
    pillar: Pillar,
    now: DateTime<Utc>,
) -> bool {
    let query = CardQuery::new()
        .pillar(pillar)
        .order(CardOrder::PublishedDesc)
        .limit(DEDUP_SCAN_LIMIT);

    let recent = match store.query_cards(&query).await {
        Ok(cards) => cards,
        Err(e) => {
            tracing::warn!(pillar = %pillar, error = %e, "dedup read failed; assuming unique");
            return false;
        }
    };

    match find_duplicate(title, &recent, now) {
        Some(existing) => {
            tracing::info!(
                pillar = %pillar,
                title,
                existing_id = %existing.id,
                existing_title = %existing.title,
                "near-duplicate of a recent card"
            );
            true
        }
        None => false,
    }
}
