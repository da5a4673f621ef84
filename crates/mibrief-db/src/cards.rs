//! Database operations for the `cards` table.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use mibrief_core::{Card, CardType, NewCard, Pillar};

use crate::DbError;

const CARD_COLUMNS: &str = "id, title, summary, signals, moves, pillar, card_type, source, \
     source_tier, source_count, priority, validation_score, content_hash, published_at, \
     created_at, linkedin_posted, linkedin_posted_at, linkedin_post_url";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `cards` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CardRow {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub signals: Json<Vec<String>>,
    pub moves: Json<Vec<String>>,
    pub pillar: String,
    pub card_type: String,
    pub source: String,
    pub source_tier: i16,
    pub source_count: Option<i32>,
    pub priority: i16,
    pub validation_score: i16,
    pub content_hash: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub linkedin_posted: bool,
    pub linkedin_posted_at: Option<DateTime<Utc>>,
    pub linkedin_post_url: Option<String>,
}

impl TryFrom<CardRow> for Card {
    type Error = DbError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        let pillar = Pillar::parse(&row.pillar)
            .ok_or_else(|| DbError::MalformedRow(format!("unknown pillar '{}'", row.pillar)))?;
        let card_type = CardType::parse(&row.card_type).ok_or_else(|| {
            DbError::MalformedRow(format!("unknown card type '{}'", row.card_type))
        })?;

        Ok(Card {
            id: row.id,
            title: row.title,
            summary: row.summary,
            signals: row.signals.0,
            moves: row.moves.0,
            pillar,
            card_type,
            source: row.source,
            source_tier: row.source_tier,
            source_count: row.source_count,
            priority: row.priority,
            validation_score: row.validation_score,
            content_hash: row.content_hash,
            published_at: row.published_at,
            created_at: row.created_at,
            linkedin_posted: row.linkedin_posted,
            linkedin_posted_at: row.linkedin_posted_at,
            linkedin_post_url: row.linkedin_post_url,
        })
    }
}

// ---------------------------------------------------------------------------
// Query shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CardOrder {
    /// Newest first.
    #[default]
    PublishedDesc,
    /// Newest first, higher priority first among equal timestamps.
    PublishedThenPriorityDesc,
}

impl CardOrder {
    fn sql(self) -> &'static str {
        match self {
            CardOrder::PublishedDesc => "published_at DESC, created_at DESC",
            CardOrder::PublishedThenPriorityDesc => "published_at DESC, priority DESC",
        }
    }
}

/// Filters for a card read: equality on pillar, content hash and posted flag,
/// a lower bound on `published_at`, an ordering and a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardQuery {
    pub pillar: Option<Pillar>,
    pub content_hash: Option<String>,
    pub published_since: Option<DateTime<Utc>>,
    pub posted: Option<bool>,
    pub order: CardOrder,
    pub limit: Option<i64>,
}

impl CardQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pillar(mut self, pillar: Pillar) -> Self {
        self.pillar = Some(pillar);
        self
    }

    #[must_use]
    pub fn content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    #[must_use]
    pub fn published_since(mut self, since: DateTime<Utc>) -> Self {
        self.published_since = Some(since);
        self
    }

    #[must_use]
    pub fn posted(mut self, posted: bool) -> Self {
        self.posted = Some(posted);
        self
    }

    #[must_use]
    pub fn order(mut self, order: CardOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a card passes every filter. Ordering and limit are not checked.
    #[must_use]
    pub fn matches(&self, card: &Card) -> bool {
        self.pillar.is_none_or(|p| card.pillar == p)
            && self
                .content_hash
                .as_deref()
                .is_none_or(|h| card.content_hash == h)
            && self.published_since.is_none_or(|t| card.published_at >= t)
            && self.posted.is_none_or(|p| card.linkedin_posted == p)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

async fn insert_row<'e, E>(executor: E, card: &NewCard) -> Result<CardRow, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let sql = format!(
        "INSERT INTO cards (id, title, summary, signals, moves, pillar, card_type, source, \
             source_tier, source_count, priority, validation_score, content_hash, published_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         ON CONFLICT (content_hash) DO NOTHING \
         RETURNING {CARD_COLUMNS}"
    );

    sqlx::query_as::<_, CardRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(&card.title)
        .bind(&card.summary)
        .bind(Json(&card.signals))
        .bind(Json(&card.moves))
        .bind(card.pillar.as_str())
        .bind(card.card_type.as_str())
        .bind(&card.source)
        .bind(card.source_tier)
        .bind(card.source_count)
        .bind(card.priority)
        .bind(card.validation_score)
        .bind(&card.content_hash)
        .bind(card.published_at)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DbError::DuplicateContentHash(card.content_hash.clone()))
}

/// Inserts one card and returns it as stored.
///
/// # Errors
///
/// Returns [`DbError::DuplicateContentHash`] if a card with the same content
/// hash exists, or [`DbError::Sqlx`] if the insert fails.
pub async fn insert_card(pool: &PgPool, card: &NewCard) -> Result<Card, DbError> {
    insert_row(pool, card).await?.try_into()
}

/// Inserts a batch of cards in a single transaction. Either every card is
/// written or none is.
///
/// # Errors
///
/// Returns [`DbError::DuplicateContentHash`] if any card collides with an
/// existing hash (the batch is rolled back), or [`DbError::Sqlx`] on failure.
pub async fn insert_cards(pool: &PgPool, cards: &[NewCard]) -> Result<Vec<Card>, DbError> {
    if cards.is_empty() {
        return Ok(Vec::new());
    }

    let mut tx = pool.begin().await?;
    let mut stored = Vec::with_capacity(cards.len());
    for card in cards {
        let row = insert_row(&mut *tx, card).await?;
        stored.push(Card::try_from(row)?);
    }
    tx.commit().await?;

    Ok(stored)
}

/// Runs a filtered, ordered read over `cards`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::MalformedRow`]
/// if a row carries an unknown pillar or card type.
pub async fn query_cards(pool: &PgPool, query: &CardQuery) -> Result<Vec<Card>, DbError> {
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM cards \
         WHERE ($1::text IS NULL OR pillar = $1) \
           AND ($2::text IS NULL OR content_hash = $2) \
           AND ($3::timestamptz IS NULL OR published_at >= $3) \
           AND ($4::boolean IS NULL OR linkedin_posted = $4) \
         ORDER BY {} \
         LIMIT $5",
        query.order.sql()
    );

    let rows = sqlx::query_as::<_, CardRow>(&sql)
        .bind(query.pillar.map(Pillar::as_str))
        .bind(query.content_hash.as_deref())
        .bind(query.published_since)
        .bind(query.posted)
        .bind(query.limit)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Card::try_from).collect()
}

/// Fetches one card by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_card(pool: &PgPool, id: Uuid) -> Result<Option<Card>, DbError> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1");
    let row = sqlx::query_as::<_, CardRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Card::try_from).transpose()
}

/// Records that a card was posted to `LinkedIn`. Re-acknowledging an already
/// posted card overwrites the timestamp and URL.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no card has the given id, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_card_posted(
    pool: &PgPool,
    id: Uuid,
    post_url: Option<&str>,
    posted_at: DateTime<Utc>,
) -> Result<Card, DbError> {
    let sql = format!(
        "UPDATE cards \
         SET linkedin_posted = TRUE, linkedin_posted_at = $2, linkedin_post_url = $3 \
         WHERE id = $1 \
         RETURNING {CARD_COLUMNS}"
    );

    sqlx::query_as::<_, CardRow>(&sql)
        .bind(id)
        .bind(posted_at)
        .bind(post_url)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?
        .try_into()
}
