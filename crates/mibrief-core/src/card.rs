//! Card data model: the untyped candidate, the validated card ready to be
//! written, and the persisted card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::CoreError;

/// Content category a card belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    AiStrategy,
    BrandPerformance,
    CompetitiveIntel,
    MediaTrends,
}

impl Pillar {
    pub const ALL: [Pillar; 4] = [
        Pillar::AiStrategy,
        Pillar::BrandPerformance,
        Pillar::CompetitiveIntel,
        Pillar::MediaTrends,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Pillar::AiStrategy => "ai_strategy",
            Pillar::BrandPerformance => "brand_performance",
            Pillar::CompetitiveIntel => "competitive_intel",
            Pillar::MediaTrends => "media_trends",
        }
    }

    /// Parse a wire value. Matching is exact: `"AI_STRATEGY"` is not a pillar.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Pillar {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::InvalidPillar(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    #[default]
    Brief,
    HotTake,
    Datapulse,
}

impl CardType {
    pub const ALL: [CardType; 3] = [CardType::Brief, CardType::HotTake, CardType::Datapulse];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Brief => "brief",
            CardType::HotTake => "hot_take",
            CardType::Datapulse => "datapulse",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CardType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::InvalidCardType(s.to_string()))
    }
}

/// A card candidate as it arrives from the LLM or over HTTP.
///
/// List and tier fields stay as raw JSON so the validator can tell "missing"
/// apart from "present but the wrong shape".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCard {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub signals: Option<Value>,
    #[serde(default)]
    pub moves: Option<Value>,
    #[serde(default)]
    pub pillar: Option<String>,
    #[serde(default, rename = "type")]
    pub card_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_tier: Option<Value>,
    #[serde(default)]
    pub source_count: Option<Value>,
    /// Only read by the validator's tier/priority consistency warning; the
    /// stored priority is always recomputed.
    #[serde(default)]
    pub priority: Option<Value>,
}

impl RawCard {
    /// Trimmed title, `None` when absent or blank.
    #[must_use]
    pub fn title_text(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    #[must_use]
    pub fn summary_text(&self) -> Option<&str> {
        non_blank(self.summary.as_deref())
    }

    #[must_use]
    pub fn source_text(&self) -> Option<&str> {
        non_blank(self.source.as_deref())
    }

    /// Signals as a JSON array, `None` when missing or not a list.
    #[must_use]
    pub fn signal_items(&self) -> Option<&Vec<Value>> {
        self.signals.as_ref().and_then(Value::as_array)
    }

    #[must_use]
    pub fn move_items(&self) -> Option<&Vec<Value>> {
        self.moves.as_ref().and_then(Value::as_array)
    }

    #[must_use]
    pub fn pillar_value(&self) -> Option<Pillar> {
        self.pillar.as_deref().and_then(Pillar::parse)
    }

    /// The declared card type. `None` when missing; `Some(Err(raw))` when the
    /// value is not a known type.
    #[must_use]
    pub fn card_type_value(&self) -> Option<Result<CardType, &str>> {
        self.card_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| CardType::parse(s).ok_or(s))
    }

    /// Source tier when it is an integer JSON number.
    #[must_use]
    pub fn source_tier_value(&self) -> Option<i64> {
        self.source_tier.as_ref().and_then(Value::as_i64)
    }

    /// Source count when present as a positive integer.
    #[must_use]
    pub fn source_count_value(&self) -> Option<u32> {
        self.source_count
            .as_ref()
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
    }

    #[must_use]
    pub fn priority_value(&self) -> Option<i64> {
        self.priority.as_ref().and_then(Value::as_i64)
    }

    /// `title`, a space, and `summary`, lowercased. Used by text rules.
    #[must_use]
    pub fn headline_text(&self) -> String {
        format!(
            "{} {}",
            self.title.as_deref().unwrap_or_default(),
            self.summary.as_deref().unwrap_or_default()
        )
        .to_lowercase()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// String items of a JSON list; non-string items are skipped.
pub(crate) fn string_items(items: &[Value]) -> impl Iterator<Item = &str> {
    items.iter().filter_map(Value::as_str)
}

/// A validated card, ready to be written to the primary collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub title: String,
    pub summary: String,
    pub signals: Vec<String>,
    pub moves: Vec<String>,
    pub pillar: Pillar,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub source: String,
    pub source_tier: i16,
    pub source_count: Option<i32>,
    pub priority: i16,
    pub validation_score: i16,
    pub content_hash: String,
    pub published_at: DateTime<Utc>,
}

impl NewCard {
    /// Build a typed card from a candidate that passed validation.
    ///
    /// `priority` must come from the priority scorer; it is clamped again here
    /// so a stored card can never leave `1..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] when a field required by the typed card is
    /// missing or malformed, which only happens if the candidate was not
    /// validated first.
    pub fn from_validated(
        raw: &RawCard,
        priority: u8,
        validation_score: u8,
        published_at: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        let title = raw
            .title_text()
            .ok_or(CoreError::MissingField("title"))?
            .to_string();
        let summary = raw
            .summary_text()
            .ok_or(CoreError::MissingField("summary"))?
            .to_string();
        let signals: Vec<String> = raw
            .signal_items()
            .ok_or(CoreError::MissingField("signals"))
            .map(|items| string_items(items).map(str::to_string).collect())?;
        let moves: Vec<String> = raw
            .move_items()
            .ok_or(CoreError::MissingField("moves"))
            .map(|items| string_items(items).map(str::to_string).collect())?;
        let pillar = match raw.pillar.as_deref() {
            Some(p) => p.parse::<Pillar>()?,
            None => return Err(CoreError::MissingField("pillar")),
        };
        // A missing or unknown type is only a warning; both become the default.
        let card_type = raw
            .card_type_value()
            .and_then(Result::ok)
            .unwrap_or_default();
        let source = raw
            .source_text()
            .ok_or(CoreError::MissingField("source"))?
            .to_string();
        let source_tier = raw
            .source_tier_value()
            .filter(|t| (1..=5).contains(t))
            .and_then(|t| i16::try_from(t).ok())
            .ok_or(CoreError::MissingField("sourceTier"))?;
        let source_count = raw
            .source_count_value()
            .map(|n| i32::try_from(n).unwrap_or(i32::MAX));

        let content_hash = content_hash(&title, &summary);

        Ok(Self {
            title,
            summary,
            signals,
            moves,
            pillar,
            card_type,
            source,
            source_tier,
            source_count,
            priority: i16::from(priority.clamp(1, 100)),
            validation_score: i16::from(validation_score.min(100)),
            content_hash,
            published_at,
        })
    }
}

/// A card in the primary collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub signals: Vec<String>,
    pub moves: Vec<String>,
    pub pillar: Pillar,
    #[serde(rename = "type")]
    pub card_type: CardType,
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

impl Card {
    /// Materialize a new card with a fresh id, as a store would on insert.
    #[must_use]
    pub fn from_new(new: NewCard, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            summary: new.summary,
            signals: new.signals,
            moves: new.moves,
            pillar: new.pillar,
            card_type: new.card_type,
            source: new.source,
            source_tier: new.source_tier,
            source_count: new.source_count,
            priority: new.priority,
            validation_score: new.validation_score,
            content_hash: new.content_hash,
            published_at: new.published_at,
            created_at,
            linkedin_posted: false,
            linkedin_posted_at: None,
            linkedin_post_url: None,
        }
    }
}

/// Why a candidate ended up in the rejection log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    Validation,
}

impl RejectionReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::Validation => "validation",
        }
    }
}

/// A candidate held for human review, with the verdict that rejected it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedCard {
    pub payload: Value,
    pub title: Option<String>,
    pub pillar: Option<String>,
    pub reason: RejectionReason,
    pub score: i16,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub rejected_at: DateTime<Utc>,
}

/// SHA-256 over the normalized title and summary, lowercase hex.
#[must_use]
pub fn content_hash(title: &str, summary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.trim().to_lowercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(summary.trim().to_lowercase().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
