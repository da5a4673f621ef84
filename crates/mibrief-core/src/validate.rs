//! Editorial validator for card candidates.
//!
//! Every rule in [`RULES`] is evaluated against the candidate, in order, with
//! no short-circuiting. Critical findings land in `issues`, quality findings
//! in `warnings`; both subtract their penalty from a score that starts at 100
//! and is clamped to `[0, 100]` at the end.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::card::{string_items, RawCard};

pub const MAX_TITLE_CHARS: usize = 80;
pub const MIN_TITLE_CHARS: usize = 20;
pub const MIN_SUMMARY_CHARS: usize = 50;
pub const MAX_SUMMARY_CHARS: usize = 500;
pub const MIN_SIGNALS: usize = 2;
pub const MAX_SIGNALS: usize = 6;
pub const MIN_MOVES: usize = 2;
pub const MAX_MOVES: usize = 5;
pub const MIN_VALID_SCORE: u8 = 50;
pub const NEXT_MOVE_PREFIX: &str = "Your next move:";

pub(crate) const HYPE_WORDS: &[&str] = &[
    "revolutionary",
    "game-changing",
    "game changer",
    "paradigm shift",
    "disrupting",
    "disruptive",
    "transformative",
    "groundbreaking",
    "unprecedented",
    "cutting-edge",
    "synergy",
];

pub(crate) const HEDGE_PHRASES: &[&str] = &[
    "consider",
    "maybe",
    "perhaps",
    "might want to",
    "should think about",
];

pub(crate) const AI_BOILERPLATE: &[&str] = &[
    "in today's fast-paced",
    "in today's digital landscape",
    "ever-evolving landscape",
    "it's important to note",
    "it is important to note",
    "delve into",
    "in the realm of",
    "navigating the complexities",
    "unlock the power",
    "in conclusion",
    "as an ai",
];

/// Inclusive code point ranges treated as emoji.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1F5FF),
    (0x1F600, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x1F700, 0x1F77F),
    (0x1F900, 0x1F9FF),
    (0x1FA70, 0x1FAFF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
    (0x1F1E6, 0x1F1FF),
];

static METRIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)%|\$|\b\d+(?:\.\d+)?x\b").expect("valid metric regex")
});

static IMPLICATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)what this means|the implication|this puts pressure on|the takeaway|the bottom line|this signals|means for",
    )
    .expect("valid implication regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Critical,
    Quality,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Finding {
    message: String,
    penalty: u32,
}

impl Finding {
    fn new(message: impl Into<String>, penalty: u32) -> Self {
        Self {
            message: message.into(),
            penalty,
        }
    }
}

/// One independent editorial rule.
struct Rule {
    severity: Severity,
    check: fn(&RawCard) -> Option<Finding>,
}

const fn critical(check: fn(&RawCard) -> Option<Finding>) -> Rule {
    Rule {
        severity: Severity::Critical,
        check,
    }
}

const fn quality(check: fn(&RawCard) -> Option<Finding>) -> Rule {
    Rule {
        severity: Severity::Quality,
        check,
    }
}

const RULES: &[Rule] = &[
    critical(title_present),
    critical(title_not_too_long),
    critical(title_not_too_short),
    critical(summary_present),
    critical(summary_not_too_short),
    critical(signals_are_list),
    critical(signals_count),
    critical(moves_are_list),
    critical(moves_count),
    critical(first_move_marker),
    critical(pillar_valid),
    critical(source_present),
    critical(source_tier_valid),
    critical(no_hype_language),
    critical(no_emoji),
    quality(summary_not_too_long),
    quality(signals_not_too_many),
    quality(moves_not_too_many),
    quality(card_type_known),
    quality(signals_have_metrics),
    quality(tier_priority_consistent),
    quality(moves_not_hedged),
    quality(no_ai_boilerplate),
    quality(summary_has_implication),
];

/// Verdict for one candidate. `score` is reported even when the candidate is
/// rejected so reviewers can triage the rejection log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub score: u8,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a card candidate.
#[must_use]
pub fn validate(card: &RawCard) -> ValidationReport {
    let mut score: i64 = 100;
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    for rule in RULES {
        let Some(finding) = (rule.check)(card) else {
            continue;
        };
        score -= i64::from(finding.penalty);
        match rule.severity {
            Severity::Critical => issues.push(finding.message),
            Severity::Quality => warnings.push(finding.message),
        }
    }

    let score = u8::try_from(score.clamp(0, 100)).unwrap_or(0);
    ValidationReport {
        is_valid: issues.is_empty() && score >= MIN_VALID_SCORE,
        score,
        issues,
        warnings,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ---------------------------------------------------------------------------
// Critical rules
// ---------------------------------------------------------------------------

fn title_present(card: &RawCard) -> Option<Finding> {
    card.title_text()
        .is_none()
        .then(|| Finding::new("Title is missing", 50))
}

fn title_not_too_long(card: &RawCard) -> Option<Finding> {
    let len = char_len(card.title_text()?);
    (len > MAX_TITLE_CHARS).then(|| {
        Finding::new(
            format!("Title too long ({len} chars, max {MAX_TITLE_CHARS})"),
            20,
        )
    })
}

fn title_not_too_short(card: &RawCard) -> Option<Finding> {
    let len = char_len(card.title_text()?);
    (len < MIN_TITLE_CHARS).then(|| {
        Finding::new(
            format!("Title too short ({len} chars, min {MIN_TITLE_CHARS})"),
            15,
        )
    })
}

fn summary_present(card: &RawCard) -> Option<Finding> {
    card.summary_text()
        .is_none()
        .then(|| Finding::new("Summary is missing", 50))
}

fn summary_not_too_short(card: &RawCard) -> Option<Finding> {
    let len = char_len(card.summary_text()?);
    (len < MIN_SUMMARY_CHARS).then(|| {
        Finding::new(
            format!("Summary too short ({len} chars, min {MIN_SUMMARY_CHARS})"),
            30,
        )
    })
}

fn signals_are_list(card: &RawCard) -> Option<Finding> {
    card.signal_items()
        .is_none()
        .then(|| Finding::new("Signals missing or not a list", 25))
}

fn signals_count(card: &RawCard) -> Option<Finding> {
    let count = string_items(card.signal_items()?).count();
    (count < MIN_SIGNALS).then(|| {
        Finding::new(
            format!("Need at least {MIN_SIGNALS} signals (found {count})"),
            25,
        )
    })
}

fn moves_are_list(card: &RawCard) -> Option<Finding> {
    card.move_items()
        .is_none()
        .then(|| Finding::new("Moves missing or not a list", 25))
}

fn moves_count(card: &RawCard) -> Option<Finding> {
    let count = string_items(card.move_items()?).count();
    (count < MIN_MOVES).then(|| {
        Finding::new(
            format!("Need at least {MIN_MOVES} moves (found {count})"),
            25,
        )
    })
}

fn first_move_marker(card: &RawCard) -> Option<Finding> {
    let first = card.move_items()?.first()?;
    let starts_right = first
        .as_str()
        .is_some_and(|m| m.starts_with(NEXT_MOVE_PREFIX));
    (!starts_right).then(|| {
        Finding::new(
            format!("First move must start with \"{NEXT_MOVE_PREFIX}\""),
            15,
        )
    })
}

fn pillar_valid(card: &RawCard) -> Option<Finding> {
    match card.pillar.as_deref().map(str::trim) {
        None | Some("") => Some(Finding::new("Pillar is missing", 20)),
        Some(_) if card.pillar_value().is_some() => None,
        Some(other) => Some(Finding::new(format!("Invalid pillar: {other}"), 20)),
    }
}

fn source_present(card: &RawCard) -> Option<Finding> {
    card.source_text()
        .is_none()
        .then(|| Finding::new("Source is missing", 20))
}

fn source_tier_valid(card: &RawCard) -> Option<Finding> {
    let valid = card
        .source_tier_value()
        .is_some_and(|t| (1..=5).contains(&t));
    (!valid).then(|| Finding::new("Source tier must be an integer from 1 to 5", 15))
}

fn no_hype_language(card: &RawCard) -> Option<Finding> {
    let text = card.headline_text();
    let found: Vec<&str> = HYPE_WORDS
        .iter()
        .copied()
        .filter(|w| text.contains(w))
        .collect();
    if found.is_empty() {
        return None;
    }
    let penalty = 10 * u32::try_from(found.len()).unwrap_or(u32::MAX / 10);
    Some(Finding::new(
        format!("Hype language detected: {}", found.join(", ")),
        penalty,
    ))
}

fn no_emoji(card: &RawCard) -> Option<Finding> {
    let has_emoji = [card.title.as_deref(), card.summary.as_deref()]
        .into_iter()
        .flatten()
        .any(|s| s.chars().any(is_emoji));
    has_emoji.then(|| Finding::new("Emoji detected in title or summary", 15))
}

fn is_emoji(c: char) -> bool {
    let cp = u32::from(c);
    EMOJI_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

// ---------------------------------------------------------------------------
// Quality rules
// ---------------------------------------------------------------------------

fn summary_not_too_long(card: &RawCard) -> Option<Finding> {
    let len = char_len(card.summary_text()?);
    (len > MAX_SUMMARY_CHARS).then(|| {
        Finding::new(
            format!("Summary is long ({len} chars, recommended max {MAX_SUMMARY_CHARS})"),
            5,
        )
    })
}

fn signals_not_too_many(card: &RawCard) -> Option<Finding> {
    let count = string_items(card.signal_items()?).count();
    (count > MAX_SIGNALS).then(|| {
        Finding::new(
            format!("Too many signals ({count}, recommended max {MAX_SIGNALS})"),
            5,
        )
    })
}

fn moves_not_too_many(card: &RawCard) -> Option<Finding> {
    let count = string_items(card.move_items()?).count();
    (count > MAX_MOVES).then(|| {
        Finding::new(
            format!("Too many moves ({count}, recommended max {MAX_MOVES})"),
            5,
        )
    })
}

fn card_type_known(card: &RawCard) -> Option<Finding> {
    match card.card_type_value() {
        None => Some(Finding::new("Card type missing; defaulting to brief", 5)),
        Some(Ok(_)) => None,
        Some(Err(other)) => Some(Finding::new(format!("Invalid card type: {other}"), 5)),
    }
}

fn signals_have_metrics(card: &RawCard) -> Option<Finding> {
    let items = card.signal_items().filter(|items| !items.is_empty())?;
    let has_metric = string_items(items).any(|s| METRIC_RE.is_match(s));
    (!has_metric).then(|| Finding::new("Signals contain no metrics (%, $, or Nx)", 5))
}

fn tier_priority_consistent(card: &RawCard) -> Option<Finding> {
    let tier = card.source_tier_value()?;
    let priority = card.priority_value()?;
    (tier > 2 && priority > 85).then(|| {
        Finding::new(
            format!("Low-authority source (tier {tier}) claims priority {priority}"),
            5,
        )
    })
}

fn moves_not_hedged(card: &RawCard) -> Option<Finding> {
    let moves = card.move_items()?;
    let text = string_items(moves)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let found: Vec<&str> = HEDGE_PHRASES
        .iter()
        .copied()
        .filter(|p| text.contains(p))
        .collect();
    (!found.is_empty()).then(|| {
        Finding::new(
            format!("Hedging language in moves: {}", found.join(", ")),
            3,
        )
    })
}

fn no_ai_boilerplate(card: &RawCard) -> Option<Finding> {
    let text = card.headline_text();
    let found: Vec<&str> = AI_BOILERPLATE
        .iter()
        .copied()
        .filter(|p| text.contains(p))
        .collect();
    (!found.is_empty())
        .then(|| Finding::new(format!("Generic AI phrasing: {}", found.join(", ")), 5))
}

fn summary_has_implication(card: &RawCard) -> Option<Finding> {
    let summary = card.summary_text()?;
    (!IMPLICATION_RE.is_match(summary))
        .then(|| Finding::new("Summary lacks implication framing", 3))
}
