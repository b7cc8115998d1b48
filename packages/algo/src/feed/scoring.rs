//! Single scoring function for feed candidates.
//!
//! ```text
//! score = w_e × engagement + w_f × freshness + w_d × difficulty + w_v × vocabulary
//! ```
//!
//! - engagement: log-damped likes/saves minus skips plus dopamine, squashed to `[0, 1)`
//! - freshness: uniform jitter so equally good items rotate between fetches
//! - difficulty: distance between content level and the preferred band
//! - vocabulary: whether the known-word share lands in the i+1 sweet spot

use std::cmp::Ordering;
use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{DifficultyFeedback, FeedCandidate, FeedItem, FeedProfile, RankingConfig};
use crate::content_metrics::ContentMetrics;
use crate::sanitize::{clamp_unit, finite_or, non_negative};
use crate::types::CefrLevel;

/// Level steps at which difficulty fit reaches zero
const DIFFICULTY_SPAN: f64 = 3.0;

pub fn engagement_score(metrics: &ContentMetrics) -> f64 {
    let positive = (non_negative(metrics.like_count) + 2.0 * non_negative(metrics.save_count)).ln_1p();
    let negative = 0.5 * non_negative(metrics.skip_count).ln_1p();
    let raw = (positive - negative + finite_or(metrics.dopamine_score, 0.0)).max(0.0);
    raw / (1.0 + raw)
}

/// +1 (i+1) for learners who are keeping up, 0 for those who are struggling,
/// then moved one step by explicit difficulty feedback.
pub fn preferred_level_offset(profile: &FeedProfile, config: &RankingConfig) -> i32 {
    let base = if profile.comprehension_score >= config.struggle_threshold {
        1
    } else {
        0
    };
    base + profile.feedback.map_or(0, DifficultyFeedback::level_shift)
}

pub fn difficulty_fit(level: CefrLevel, profile: &FeedProfile, config: &RankingConfig) -> f64 {
    let offset = level.index() as i32 - profile.level.index() as i32;
    let distance = (offset - preferred_level_offset(profile, config)).abs() as f64;
    1.0 - (distance / DIFFICULTY_SPAN).min(1.0)
}

/// Share of distinct candidate words the learner already knows
pub fn known_word_share(words: &[String], known: &HashSet<String>) -> Option<f64> {
    let distinct: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
    if distinct.is_empty() {
        return None;
    }
    let known_count = distinct.iter().filter(|w| known.contains(*w)).count();
    Some(known_count as f64 / distinct.len() as f64)
}

pub fn vocabulary_fit(share: Option<f64>, config: &RankingConfig) -> f64 {
    match share {
        None => config.unknown_vocabulary_fit,
        Some(s) if s > config.sweet_spot_max => config.too_easy_fit,
        Some(s) if s >= config.sweet_spot_min => 1.0,
        Some(_) => config.too_hard_fit,
    }
}

fn new_words(words: &[String], known: &HashSet<String>, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    words
        .iter()
        .map(|w| w.to_lowercase())
        .filter(|w| !known.contains(w) && seen.insert(w.clone()))
        .take(limit)
        .collect()
}

fn score_candidate<R: Rng>(
    candidate: FeedCandidate,
    profile: &FeedProfile,
    config: &RankingConfig,
    rng: &mut R,
) -> FeedItem {
    let weights = &config.weights;
    let share = known_word_share(&candidate.words, &profile.known_words);
    let freshness: f64 = if weights.freshness > 0.0 { rng.gen() } else { 0.0 };

    let score = weights.engagement * engagement_score(&candidate.engagement)
        + weights.freshness * freshness
        + weights.difficulty * difficulty_fit(candidate.level, profile, config)
        + weights.vocabulary * vocabulary_fit(share, config);

    FeedItem {
        new_words: new_words(&candidate.words, &profile.known_words, config.max_new_words),
        id: candidate.id,
        content_type: candidate.content_type,
        level: candidate.level,
        title: candidate.title,
        source: candidate.source,
        score: finite_or(score, 0.0),
        known_word_share: share.map(clamp_unit),
    }
}

/// Score and sort candidates, best first. Equal scores keep input order.
pub fn rank_candidates<R: Rng>(
    candidates: Vec<FeedCandidate>,
    profile: &FeedProfile,
    config: &RankingConfig,
    rng: &mut R,
) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = candidates
        .into_iter()
        .map(|candidate| score_candidate(candidate, profile, config, rng))
        .collect();
    items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    items
}

/// [`rank_candidates`] with freshness jitter drawn from a seeded generator,
/// for callers that do not carry their own RNG.
pub fn rank_candidates_seeded(
    candidates: Vec<FeedCandidate>,
    profile: &FeedProfile,
    config: &RankingConfig,
    seed: u64,
) -> Vec<FeedItem> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rank_candidates(candidates, profile, config, &mut rng)
}
