//! User Score Updater
//!
//! Rolling per-user scores. Comprehension follows a slow exponential moving
//! average of the inferred per-interaction comprehension; engagement drifts by
//! small fixed steps depending on whether the interaction was a positive or a
//! negative signal. Streaks count consecutive active calendar days.

use serde::{Deserialize, Serialize};

use crate::sanitize::{clamp_unit, finite_or};
use crate::types::{InteractionType, NEUTRAL_SCORE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserScoreConfig {
    /// Weight of the newest observation in the comprehension EMA
    pub smoothing: f64,
    pub positive_engagement_delta: f64,
    pub negative_engagement_delta: f64,
}

impl Default for UserScoreConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.1,
            positive_engagement_delta: 0.01,
            negative_engagement_delta: -0.005,
        }
    }
}

/// Engagement step for one interaction kind
pub fn engagement_delta(interaction_type: &InteractionType, config: &UserScoreConfig) -> f64 {
    match interaction_type {
        InteractionType::DoubleTap | InteractionType::Save | InteractionType::SwipeRight => {
            config.positive_engagement_delta
        }
        InteractionType::Skip | InteractionType::SwipeLeft => config.negative_engagement_delta,
        _ => 0.0,
    }
}

pub fn smooth_comprehension(current: f64, observed: f64, config: &UserScoreConfig) -> f64 {
    let alpha = clamp_unit(config.smoothing);
    let current = clamp_unit(finite_or(current, NEUTRAL_SCORE));
    clamp_unit(current * (1.0 - alpha) + clamp_unit(observed) * alpha)
}

pub fn adjust_engagement(current: f64, delta: f64) -> f64 {
    clamp_unit(finite_or(current, NEUTRAL_SCORE) + finite_or(delta, 0.0))
}

// ==================== Streaks ====================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub streak_days: i32,
    pub longest_streak: i32,
}

/// Advance a streak given the number of calendar days since the last activity.
///
/// `None` means the user was never active before. Negative gaps (clock skew)
/// count as the same day.
pub fn advance_streak(state: StreakState, days_since_last_active: Option<i64>) -> StreakState {
    let streak_days = match days_since_last_active {
        Some(days) if days <= 0 => state.streak_days.max(1),
        Some(1) => state.streak_days.max(0).saturating_add(1),
        _ => 1,
    };
    StreakState {
        streak_days,
        longest_streak: state.longest_streak.max(streak_days),
    }
}

// ==================== Combined update ====================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub comprehension_score: f64,
    pub engagement_score: f64,
    pub total_xp: i64,
    pub streak_days: i32,
    pub longest_streak: i32,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            comprehension_score: NEUTRAL_SCORE,
            engagement_score: NEUTRAL_SCORE,
            total_xp: 0,
            streak_days: 0,
            longest_streak: 0,
        }
    }
}

/// Everything one interaction contributes to a user's progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub inferred_comprehension: f64,
    pub engagement_delta: f64,
    pub xp_earned: u32,
    pub days_since_last_active: Option<i64>,
}

/// Apply one interaction to a progress snapshot. Storage adapters call this
/// inside their critical section so concurrent activities compose.
pub fn apply_activity(
    progress: &UserProgress,
    activity: &Activity,
    config: &UserScoreConfig,
) -> UserProgress {
    let streak = advance_streak(
        StreakState {
            streak_days: progress.streak_days,
            longest_streak: progress.longest_streak,
        },
        activity.days_since_last_active,
    );

    UserProgress {
        comprehension_score: smooth_comprehension(
            progress.comprehension_score,
            activity.inferred_comprehension,
            config,
        ),
        engagement_score: adjust_engagement(progress.engagement_score, activity.engagement_delta),
        total_xp: progress
            .total_xp
            .max(0)
            .saturating_add(i64::from(activity.xp_earned)),
        streak_days: streak.streak_days,
        longest_streak: streak.longest_streak,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EPSILON;

    #[test]
    fn test_comprehension_ema() {
        let config = UserScoreConfig::default();
        let updated = smooth_comprehension(0.5, 0.8, &config);
        assert!((updated - 0.53).abs() < EPSILON);
    }

    #[test]
    fn test_engagement_deltas() {
        let config = UserScoreConfig::default();
        assert_eq!(engagement_delta(&InteractionType::Save, &config), 0.01);
        assert_eq!(engagement_delta(&InteractionType::DoubleTap, &config), 0.01);
        assert_eq!(engagement_delta(&InteractionType::Skip, &config), -0.005);
        assert_eq!(engagement_delta(&InteractionType::Completed, &config), 0.0);
        assert_eq!(
            engagement_delta(&InteractionType::Other("SHARE".into()), &config),
            0.0
        );
    }

    #[test]
    fn test_engagement_saturates() {
        assert_eq!(adjust_engagement(0.995, 0.01), 1.0);
        assert_eq!(adjust_engagement(0.002, -0.005), 0.0);
    }

    #[test]
    fn test_scores_stay_bounded_over_long_sequences() {
        let config = UserScoreConfig::default();
        let mut progress = UserProgress::default();
        for i in 0..5_000 {
            let activity = Activity {
                inferred_comprehension: if i % 2 == 0 { 1.0 } else { 0.0 },
                engagement_delta: if i < 2_500 { 0.01 } else { -0.005 },
                xp_earned: 3,
                days_since_last_active: Some(0),
            };
            progress = apply_activity(&progress, &activity, &config);
            assert!((0.0..=1.0).contains(&progress.comprehension_score));
            assert!((0.0..=1.0).contains(&progress.engagement_score));
        }
        assert_eq!(progress.total_xp, 15_000);
    }

    #[test]
    fn test_streak_transitions() {
        let start = StreakState {
            streak_days: 3,
            longest_streak: 5,
        };

        let same_day = advance_streak(start, Some(0));
        assert_eq!(same_day.streak_days, 3);

        let next_day = advance_streak(start, Some(1));
        assert_eq!(next_day.streak_days, 4);
        assert_eq!(next_day.longest_streak, 5);

        let broken = advance_streak(start, Some(4));
        assert_eq!(broken.streak_days, 1);
        assert_eq!(broken.longest_streak, 5);

        let first = advance_streak(StreakState::default(), None);
        assert_eq!(first, StreakState { streak_days: 1, longest_streak: 1 });
    }

    #[test]
    fn test_longest_streak_follows_current() {
        let mut state = StreakState::default();
        for day in 0..7 {
            state = advance_streak(state, if day == 0 { None } else { Some(1) });
        }
        assert_eq!(state.streak_days, 7);
        assert_eq!(state.longest_streak, 7);
    }
}
