//! Property-Based Tests for learner score bounds
//!
//! Tests the following invariants:
//! - Inferred comprehension stays in [0, 1] for any signal combination
//! - Stored comprehension and engagement stay in [0, 1] across arbitrary
//!   interaction sequences
//! - XP never decreases and grows by exactly the awarded amount
//! - Word counters never go negative

use proptest::prelude::*;

use langfeed_algo::{
    apply_activity, estimate_comprehension, Activity, ComprehensionConfig, InteractionSignals,
    UserProgress, UserScoreConfig,
};
use langfeed_backend::engine::InteractionInput;
use langfeed_backend::store::{LearningStore, WordKey};

mod common;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_f64_0_1() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_interaction_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("COMPLETED"),
        Just("SWIPE_UP"),
        Just("SWIPE_LEFT"),
        Just("SWIPE_RIGHT"),
        Just("DOUBLE_TAP"),
        Just("SAVE"),
        Just("SKIP"),
        Just("REPLAY"),
        Just("WORD_LOOKUP"),
        Just("SHARE"),
    ]
}

fn arb_signals() -> impl Strategy<Value = InteractionSignals> {
    (
        proptest::option::of(0.0f64..=600.0),  // time_spent_seconds
        proptest::option::of(arb_f64_0_1()),   // completion_rate
        proptest::option::of(0u32..=20u32),    // words_looked_up
        proptest::option::of(0u32..=10u32),    // replay_count
        proptest::option::of(1.0f64..=300.0),  // content_duration_seconds
    )
        .prop_map(
            |(time_spent_seconds, completion_rate, words_looked_up, replay_count, content_duration_seconds)| {
                InteractionSignals {
                    time_spent_seconds,
                    completion_rate,
                    words_looked_up,
                    replay_count,
                    content_duration_seconds,
                }
            },
        )
}

fn arb_progress() -> impl Strategy<Value = UserProgress> {
    (arb_f64_0_1(), arb_f64_0_1(), 0i64..=1_000_000i64, 0i32..=400i32).prop_map(
        |(comprehension_score, engagement_score, total_xp, streak_days)| UserProgress {
            comprehension_score,
            engagement_score,
            total_xp,
            streak_days,
            longest_streak: streak_days,
        },
    )
}

fn arb_activity() -> impl Strategy<Value = Activity> {
    (
        arb_f64_0_1(),
        (-0.05f64..=0.05f64),
        0u32..=200u32,
        proptest::option::of(-2i64..=30i64),
    )
        .prop_map(
            |(inferred_comprehension, engagement_delta, xp_earned, days_since_last_active)| Activity {
                inferred_comprehension,
                engagement_delta,
                xp_earned,
                days_since_last_active,
            },
        )
}

fn input_for(interaction_type: &str, signals: InteractionSignals) -> InteractionInput {
    InteractionInput {
        user_id: "pbt-user".to_string(),
        content_id: "pbt-content".to_string(),
        interaction_type: interaction_type.to_string(),
        signals,
        word: Some("gato".to_string()),
    }
}

// ============================================================================
// Pure policy properties
// ============================================================================

proptest! {
    #[test]
    fn prop_inferred_comprehension_is_bounded(signals in arb_signals()) {
        let score = estimate_comprehension(&signals, &ComprehensionConfig::default());
        prop_assert!((0.0..=1.0).contains(&score), "score {}", score);
    }

    #[test]
    fn prop_apply_activity_keeps_scores_in_range(
        progress in arb_progress(),
        activity in arb_activity(),
    ) {
        let next = apply_activity(&progress, &activity, &UserScoreConfig::default());

        prop_assert!((0.0..=1.0).contains(&next.comprehension_score));
        prop_assert!((0.0..=1.0).contains(&next.engagement_score));
        prop_assert_eq!(next.total_xp, progress.total_xp + i64::from(activity.xp_earned));
        prop_assert!(next.streak_days >= 1);
        prop_assert!(next.longest_streak >= next.streak_days);
    }
}

// ============================================================================
// Engine properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_interaction_sequences_keep_user_bounded(
        steps in proptest::collection::vec((arb_interaction_type(), arb_signals()), 1..25),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let h = common::harness(Vec::new());
            common::seed_content(&h.store, "pbt-content", &["gato", "perro"]).await;

            let mut last_xp = 0i64;
            for (interaction_type, signals) in steps {
                let outcome = h
                    .engine
                    .record_interaction(input_for(interaction_type, signals))
                    .await
                    .unwrap();

                assert!((0.0..=1.0).contains(&outcome.inferred_comprehension));

                let user = outcome.user.expect("memory store never fails the user update");
                assert!((0.0..=1.0).contains(&user.comprehension_score));
                assert!((0.0..=1.0).contains(&user.engagement_score));
                assert!(user.total_xp >= last_xp);
                assert_eq!(user.total_xp - last_xp, i64::from(outcome.xp_earned));
                last_xp = user.total_xp;
            }

            for word in ["gato", "perro"] {
                let key = WordKey::new("pbt-user", "es", word);
                if let Some(record) = h.store.get_word_knowledge(&key).await.unwrap() {
                    assert!(record.counters.exposure_count >= 0);
                    assert!(record.counters.lookup_count >= 0);
                    assert!((0.0..=1.0).contains(&record.confidence_score));
                }
            }
        });
    }
}
