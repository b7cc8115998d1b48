//! Word Knowledge Model
//!
//! Per-(user, word) confidence derived from four monotone counters:
//! exposures and correct reviews raise it, incorrect reviews and lookups
//! lower it. Counters themselves are owned by storage, which must increment
//! them atomically; this module only derives values from a snapshot.
//!
//! States are derived, never stored:
//!
//! | state    | rule                                                   |
//! |----------|--------------------------------------------------------|
//! | New      | no exposure yet                                        |
//! | Known    | confidence ≥ known threshold                           |
//! | Learning | confidence ≥ learning threshold, or any lookup         |
//! | Exposed  | seen passively, confidence still below learning        |

use serde::{Deserialize, Serialize};

use crate::sanitize::{clamp_unit, non_negative};
use crate::types::InteractionType;

/// Cap for the exponent so pathological counters stay cheap
const MAX_EFFECTIVE_EXPOSURES: i64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordKnowledgeConfig {
    /// Completion rate at or above which an interaction counts as an exposure
    pub qualifying_completion: f64,
    /// Confidence assigned when a word is first seen
    pub initial_confidence: f64,
    /// Share of the remaining gap closed by every exposure
    pub exposure_gain: f64,
    pub correct_weight: f64,
    pub incorrect_weight: f64,
    pub lookup_weight: f64,
    pub learning_threshold: f64,
    pub known_threshold: f64,
}

impl Default for WordKnowledgeConfig {
    fn default() -> Self {
        Self {
            qualifying_completion: 0.7,
            initial_confidence: 0.1,
            exposure_gain: 0.1,
            correct_weight: 0.1,
            incorrect_weight: 0.15,
            lookup_weight: 0.05,
            learning_threshold: 0.3,
            known_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WordState {
    New,
    Exposed,
    Learning,
    Known,
}

impl WordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Exposed => "EXPOSED",
            Self::Learning => "LEARNING",
            Self::Known => "KNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCounters {
    pub exposure_count: i64,
    pub correct_reviews: i64,
    pub incorrect_reviews: i64,
    pub lookup_count: i64,
}

/// Whether an interaction exposes the learner to the item's vocabulary
pub fn qualifies_for_exposure(
    interaction_type: &InteractionType,
    completion_rate: Option<f64>,
    config: &WordKnowledgeConfig,
) -> bool {
    *interaction_type == InteractionType::Completed
        || completion_rate.is_some_and(|rate| rate >= config.qualifying_completion)
}

pub fn compute_confidence(counters: &WordCounters, config: &WordKnowledgeConfig) -> f64 {
    let exposures = counters.exposure_count.clamp(0, MAX_EFFECTIVE_EXPOSURES) as i32;
    // First exposure lands on the initial confidence; each later one closes
    // `exposure_gain` of the remaining gap.
    let familiarity = if exposures == 0 {
        0.0
    } else {
        let remaining = 1.0 - clamp_unit(config.initial_confidence);
        1.0 - remaining * (1.0 - clamp_unit(config.exposure_gain)).powi(exposures - 1)
    };

    let reviews = non_negative(counters.correct_reviews) * config.correct_weight
        - non_negative(counters.incorrect_reviews) * config.incorrect_weight
        - non_negative(counters.lookup_count) * config.lookup_weight;

    clamp_unit(familiarity + reviews)
}

pub fn classify(counters: &WordCounters, confidence: f64, config: &WordKnowledgeConfig) -> WordState {
    if counters.exposure_count <= 0 {
        return WordState::New;
    }
    if confidence >= config.known_threshold {
        return WordState::Known;
    }
    if confidence >= config.learning_threshold || counters.lookup_count > 0 {
        return WordState::Learning;
    }
    WordState::Exposed
}
