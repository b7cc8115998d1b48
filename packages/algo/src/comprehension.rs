//! Comprehension Estimator
//!
//! Infers how well a learner understood a feed item from passive behavior.
//!
//! The estimate starts at a neutral prior and each signal that is present
//! moves it:
//! - completion rate replaces the prior (`rate × 0.6`)
//! - any recorded watch time adds an engagement credit
//! - every looked-up word subtracts a fixed penalty
//! - a few replays read as review (+), many replays read as confusion (−)
//!
//! The result is clamped to `[0, 1]`. Pure and deterministic.

use serde::{Deserialize, Serialize};

use crate::sanitize::clamp_unit;
use crate::types::{InteractionSignals, NEUTRAL_SCORE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensionConfig {
    pub neutral: f64,
    pub completion_weight: f64,
    pub time_credit: f64,
    pub lookup_penalty: f64,
    pub replay_bonus: f64,
    pub replay_penalty: f64,
    /// Replays above this count are a confusion signal
    pub confusion_replay_threshold: u32,
    /// Scale the time credit by `time_spent / content_duration` when the
    /// caller supplies a duration. Off by default: the flat credit is what
    /// every stored comprehension and confidence value was computed with.
    pub duration_relative_time_credit: bool,
}

impl Default for ComprehensionConfig {
    fn default() -> Self {
        Self {
            neutral: NEUTRAL_SCORE,
            completion_weight: 0.6,
            time_credit: 0.2,
            lookup_penalty: 0.05,
            replay_bonus: 0.1,
            replay_penalty: 0.1,
            confusion_replay_threshold: 2,
            duration_relative_time_credit: false,
        }
    }
}

pub fn estimate_comprehension(signals: &InteractionSignals, config: &ComprehensionConfig) -> f64 {
    let mut score = config.neutral;

    if let Some(rate) = signals.completion_rate {
        score = clamp_unit(rate) * config.completion_weight;
    }

    if let Some(time_spent) = signals.time_spent_seconds {
        score += time_credit(time_spent, signals.content_duration_seconds, config);
    }

    if let Some(lookups) = signals.words_looked_up {
        score -= f64::from(lookups) * config.lookup_penalty;
    }

    if let Some(replays) = signals.replay_count.filter(|&r| r > 0) {
        if replays <= config.confusion_replay_threshold {
            score += config.replay_bonus;
        } else {
            score -= config.replay_penalty;
        }
    }

    clamp_unit(score)
}

fn time_credit(time_spent: f64, duration: Option<f64>, config: &ComprehensionConfig) -> f64 {
    match duration {
        Some(duration) if config.duration_relative_time_credit && duration > 0.0 => {
            config.time_credit * clamp_unit(time_spent.max(0.0) / duration)
        }
        _ => config.time_credit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON;

    fn signals() -> InteractionSignals {
        InteractionSignals::default()
    }

    #[test]
    fn test_no_signals_is_neutral() {
        let score = estimate_comprehension(&signals(), &ComprehensionConfig::default());
        assert!((score - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_full_completion_with_watch_time() {
        let input = InteractionSignals {
            completion_rate: Some(1.0),
            time_spent_seconds: Some(30.0),
            ..signals()
        };
        let score = estimate_comprehension(&input, &ComprehensionConfig::default());
        assert!((score - 0.8).abs() < EPSILON);
    }

    #[test]
    fn test_half_completion_with_two_lookups() {
        let input = InteractionSignals {
            completion_rate: Some(0.5),
            time_spent_seconds: Some(12.0),
            words_looked_up: Some(2),
            ..signals()
        };
        let score = estimate_comprehension(&input, &ComprehensionConfig::default());
        assert!((score - 0.40).abs() < EPSILON);
    }

    #[test]
    fn test_time_only_adds_credit_to_neutral() {
        let input = InteractionSignals {
            time_spent_seconds: Some(5.0),
            ..signals()
        };
        let score = estimate_comprehension(&input, &ComprehensionConfig::default());
        assert!((score - 0.7).abs() < EPSILON);
    }

    #[test]
    fn test_replays_review_versus_confusion() {
        let config = ComprehensionConfig::default();
        let review = InteractionSignals {
            completion_rate: Some(1.0),
            replay_count: Some(2),
            ..signals()
        };
        let confused = InteractionSignals {
            replay_count: Some(3),
            ..review.clone()
        };
        let zero = InteractionSignals {
            replay_count: Some(0),
            ..review.clone()
        };

        assert!((estimate_comprehension(&review, &config) - 0.7).abs() < EPSILON);
        assert!((estimate_comprehension(&confused, &config) - 0.5).abs() < EPSILON);
        assert!((estimate_comprehension(&zero, &config) - 0.6).abs() < EPSILON);
    }

    #[test]
    fn test_many_lookups_clamp_to_zero() {
        let input = InteractionSignals {
            completion_rate: Some(0.2),
            words_looked_up: Some(40),
            ..signals()
        };
        assert_eq!(
            estimate_comprehension(&input, &ComprehensionConfig::default()),
            0.0
        );
    }

    #[test]
    fn test_out_of_range_completion_is_clamped() {
        let input = InteractionSignals {
            completion_rate: Some(3.0),
            time_spent_seconds: Some(1.0),
            replay_count: Some(1),
            ..signals()
        };
        let score = estimate_comprehension(&input, &ComprehensionConfig::default());
        assert!((0.0..=1.0).contains(&score));
        assert!((score - 0.9).abs() < EPSILON);
    }

    #[test]
    fn test_duration_relative_credit_scales_with_watch_share() {
        let config = ComprehensionConfig {
            duration_relative_time_credit: true,
            ..ComprehensionConfig::default()
        };
        let input = InteractionSignals {
            completion_rate: Some(0.5),
            time_spent_seconds: Some(30.0),
            content_duration_seconds: Some(60.0),
            ..signals()
        };
        let score = estimate_comprehension(&input, &config);
        assert!((score - 0.4).abs() < EPSILON);
    }

    #[test]
    fn test_duration_ignored_when_flat_credit_configured() {
        let input = InteractionSignals {
            completion_rate: Some(0.5),
            time_spent_seconds: Some(30.0),
            content_duration_seconds: Some(60.0),
            ..signals()
        };
        let score = estimate_comprehension(&input, &ComprehensionConfig::default());
        assert!((score - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_duration_relative_without_duration_falls_back_to_flat() {
        let config = ComprehensionConfig {
            duration_relative_time_credit: true,
            ..ComprehensionConfig::default()
        };
        let input = InteractionSignals {
            completion_rate: Some(1.0),
            time_spent_seconds: Some(10.0),
            ..signals()
        };
        assert!((estimate_comprehension(&input, &config) - 0.8).abs() < EPSILON);
    }
}
