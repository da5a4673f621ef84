//! Primary-topic extraction and title overlap, the two pure halves of the
//! near-duplicate check.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Similarity above which two same-topic titles are duplicates.
pub const DUPLICATE_THRESHOLD: f64 = 0.5;

/// Brands and companies that make a better dedup key than the first word of
/// a headline. Matched case-insensitively as substrings, in this order.
pub const KNOWN_BRANDS: &[&str] = &[
    "openai",
    "anthropic",
    "google",
    "youtube",
    "meta",
    "facebook",
    "instagram",
    "whatsapp",
    "amazon",
    "apple",
    "microsoft",
    "nvidia",
    "tiktok",
    "netflix",
    "disney",
    "spotify",
    "salesforce",
    "adobe",
    "hubspot",
    "shopify",
    "walmart",
    "target",
    "nike",
    "coca-cola",
    "pepsi",
    "unilever",
    "procter",
    "linkedin",
    "pinterest",
    "snapchat",
    "reddit",
    "perplexity",
    "mistral",
    "wpp",
    "omnicom",
    "publicis",
    "dentsu",
];

static CAPITALIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9]+\b").expect("valid capitalized-token regex")
});

/// Extract the coarse dedup key for a title.
///
/// Known brand first, then the first capitalized token, then the first 20
/// characters. Always lowercase.
#[must_use]
pub fn primary_topic(title: &str) -> String {
    let lower = title.to_lowercase();
    if let Some(brand) = KNOWN_BRANDS.iter().find(|b| lower.contains(*b)) {
        return (*brand).to_string();
    }
    if let Some(token) = CAPITALIZED_RE.find(title) {
        return token.as_str().to_lowercase();
    }
    lower.chars().take(20).collect()
}

/// Lowercase, drop everything but letters, digits and whitespace, keep words
/// longer than three characters.
fn significant_words(title: &str) -> HashSet<String> {
    let normalized: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

/// Shared significant words over the size of the larger word set.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let words_a = significant_words(a);
    let words_b = significant_words(b);
    let larger = words_a.len().max(words_b.len());
    if larger == 0 {
        return 0.0;
    }
    let shared = words_a.intersection(&words_b).count();
    shared as f64 / larger as f64
}

/// Whether `candidate` duplicates `existing`: same primary topic and
/// similarity above [`DUPLICATE_THRESHOLD`].
#[must_use]
pub fn is_near_duplicate(candidate: &str, existing: &str) -> bool {
    primary_topic(candidate) == primary_topic(existing)
        && title_similarity(candidate, existing) > DUPLICATE_THRESHOLD
}
