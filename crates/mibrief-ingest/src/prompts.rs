//! Prompts for the two LLM calls of a slot.

use mibrief_core::{CardType, PillarConfig};

/// System prompt for the news search call.
pub const SEARCH_SYSTEM_PROMPT: &str = "You are a research assistant for a marketing \
intelligence desk. Report the single most significant news story from the last 24 hours \
that matches the request. Give the facts plainly: who, what, the numbers involved, and \
the named sources. Do not speculate and do not add commentary.";

/// Fixed system prompt for the summarization call. Sent with a cache hint,
/// so it must not vary between calls.
pub const SUMMARY_SYSTEM_PROMPT: &str = r#"You turn one news story into one intelligence card for senior marketers.

Respond with a single JSON object and nothing else. Shape:
{
  "title": string,        // 20 to 80 characters, concrete, names the company or market
  "summary": string,      // 50 to 500 characters; state what happened, then what this means for marketers
  "signals": [string],    // 2 to 6 short facts, each with a metric such as %, $ or 3x
  "moves": [string],      // 2 to 5 actions; the first starts with "Your next move:"
  "pillar": "ai_strategy" | "brand_performance" | "competitive_intel" | "media_trends",
  "type": "brief" | "hot_take" | "datapulse",
  "source": string,       // publication name of the main source
  "sourceTier": integer,  // 1 = wire service or primary filing, 5 = blog or forum
  "sourceCount": integer  // number of independent sources you used
}

Style rules:
- No emoji. No hype words such as revolutionary, game-changing, unprecedented or synergy.
- Moves are direct instructions. Do not hedge with consider, maybe or perhaps.
- No filler such as "in today's fast-paced world" or "it's important to note".
- Frame the implication explicitly, for example "what this means for CMOs is ...".

Card types:
- brief: a neutral summary of the story and its consequences.
- hot_take: a sharp, defensible opinion on the story.
- datapulse: lead with the single most striking number."#;

/// Human-readable line listing topics already covered this run.
fn exclusion_line(exclusions: &[String]) -> Option<String> {
    if exclusions.is_empty() {
        None
    } else {
        Some(format!(
            "Avoid these topics, already covered today: {}.",
            exclusions.join(", ")
        ))
    }
}

/// User prompt for the search call of one slot.
#[must_use]
pub fn search_prompt(plan: &PillarConfig, card_type: CardType, exclusions: &[String]) -> String {
    let mut prompt = format!(
        "{}\nThe story will become a {} card for the {} pillar.",
        plan.query.trim(),
        card_type,
        plan.pillar
    );
    if let Some(line) = exclusion_line(exclusions) {
        prompt.push('\n');
        prompt.push_str(&line);
    }
    prompt
}

/// User prompt for the summarization call of one slot.
#[must_use]
pub fn summary_prompt(
    plan: &PillarConfig,
    card_type: CardType,
    raw_text: &str,
    exclusions: &[String],
) -> String {
    let mut prompt = format!(
        "Write a {card_type} card for the {} pillar from this story:\n\n{}\n",
        plan.pillar,
        raw_text.trim()
    );
    if let Some(line) = exclusion_line(exclusions) {
        prompt.push('\n');
        prompt.push_str(&line);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use mibrief_core::Pillar;

    use super::*;

    fn plan() -> PillarConfig {
        PillarConfig {
            pillar: Pillar::MediaTrends,
            query: "  Latest retail media news ".to_string(),
            domains: vec![],
            slots: vec![CardType::Brief],
        }
    }

    #[test]
    fn search_prompt_without_exclusions() {
        let prompt = search_prompt(&plan(), CardType::HotTake, &[]);
        assert_eq!(
            prompt,
            "Latest retail media news\nThe story will become a hot_take card for the media_trends pillar."
        );
    }

    #[test]
    fn exclusions_are_listed_in_both_prompts() {
        let exclusions = vec!["google".to_string(), "amazon".to_string()];
        let search = search_prompt(&plan(), CardType::Brief, &exclusions);
        let summary = summary_prompt(&plan(), CardType::Brief, "story", &exclusions);
        for prompt in [search, summary] {
            assert!(
                prompt.contains("Avoid these topics, already covered today: google, amazon."),
                "{prompt}"
            );
        }
    }

    #[test]
    fn summary_prompt_embeds_story() {
        let prompt = summary_prompt(&plan(), CardType::Datapulse, "  Amazon ads grew 20%.  ", &[]);
        assert!(prompt.starts_with("Write a datapulse card for the media_trends pillar"));
        assert!(prompt.contains("\n\nAmazon ads grew 20%.\n"));
    }
}
