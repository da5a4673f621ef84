//! Priority scorer used to rank cards for publishing.

use rand::Rng;

use crate::card::{CardType, Pillar};

const BASE: u32 = 50;
/// Every candidate is same-day news, so recency is a flat bonus.
const RECENCY_BONUS: u32 = 20;
const BRIEF_BONUS: u32 = 5;
const UNKNOWN_PILLAR_WEIGHT: u32 = 5;
const MAX_JITTER: u32 = 4;

fn source_bonus(source_count: u32) -> u32 {
    match source_count {
        15.. => 20,
        10..=14 => 15,
        5..=9 => 10,
        _ => 5,
    }
}

fn pillar_weight(pillar: Option<Pillar>) -> u32 {
    match pillar {
        Some(Pillar::AiStrategy) => 15,
        Some(Pillar::CompetitiveIntel) => 10,
        Some(Pillar::BrandPerformance) => 8,
        Some(Pillar::MediaTrends) => 7,
        None => UNKNOWN_PILLAR_WEIGHT,
    }
}

/// Deterministic part of the score, before jitter and clamping.
#[must_use]
pub fn base_priority(source_count: u32, pillar: Option<Pillar>, card_type: CardType) -> u32 {
    let type_bonus = if card_type == CardType::Brief {
        BRIEF_BONUS
    } else {
        0
    };
    BASE + RECENCY_BONUS + source_bonus(source_count) + pillar_weight(pillar) + type_bonus
}

/// Score a card in `1..=100` using the thread-local RNG for tie-break jitter.
#[must_use]
pub fn priority_score(source_count: u32, pillar: Option<Pillar>, card_type: CardType) -> u8 {
    priority_score_with(&mut rand::rng(), source_count, pillar, card_type)
}

/// Score a card with an explicit jitter source.
pub fn priority_score_with<R: Rng + ?Sized>(
    rng: &mut R,
    source_count: u32,
    pillar: Option<Pillar>,
    card_type: CardType,
) -> u8 {
    let jitter = rng.random_range(0..=MAX_JITTER);
    let raw = base_priority(source_count, pillar, card_type) + jitter;
    u8::try_from(raw.clamp(1, 100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn top_inputs_clamp_to_100() {
        assert_eq!(base_priority(20, Some(Pillar::AiStrategy), CardType::Brief), 110);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let score = priority_score_with(&mut rng, 20, Some(Pillar::AiStrategy), CardType::Brief);
            assert_eq!(score, 100);
        }
    }

    #[test]
    fn jitter_stays_within_four() {
        let base = base_priority(3, Some(Pillar::MediaTrends), CardType::HotTake);
        assert_eq!(base, 50 + 20 + 5 + 7);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let score = u32::from(priority_score_with(
                &mut rng,
                3,
                Some(Pillar::MediaTrends),
                CardType::HotTake,
            ));
            assert!((base..=base + 4).contains(&score), "score {score}");
        }
    }

    #[test]
    fn source_tiers_step_at_thresholds() {
        assert_eq!(source_bonus(0), 5);
        assert_eq!(source_bonus(4), 5);
        assert_eq!(source_bonus(5), 10);
        assert_eq!(source_bonus(10), 15);
        assert_eq!(source_bonus(14), 15);
        assert_eq!(source_bonus(15), 20);
    }

    #[test]
    fn brief_outranks_hot_take_and_datapulse() {
        let brief = base_priority(5, Some(Pillar::CompetitiveIntel), CardType::Brief);
        let hot = base_priority(5, Some(Pillar::CompetitiveIntel), CardType::HotTake);
        let pulse = base_priority(5, Some(Pillar::CompetitiveIntel), CardType::Datapulse);
        assert_eq!(brief, hot + 5);
        assert_eq!(hot, pulse);
    }

    #[test]
    fn unknown_pillar_gets_smallest_weight() {
        assert_eq!(
            base_priority(1, None, CardType::HotTake),
            base_priority(1, Some(Pillar::MediaTrends), CardType::HotTake) - 2
        );
    }

    #[test]
    fn unseeded_score_is_in_range() {
        let score = priority_score(1, Some(Pillar::BrandPerformance), CardType::Datapulse);
        assert!((1..=100).contains(&score));
    }
}
