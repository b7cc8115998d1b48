//! # langfeed-algo - adaptive learning feed policies
//!
//! Pure, synchronous policy code for a short-form feed aimed at language
//! learners. Nothing in this crate performs I/O; storage adapters and the HTTP
//! service call into it with snapshots and persist the results.
//!
//! ## Modules
//!
//! - [`comprehension`] - behavioral signals → inferred comprehension
//! - [`word_knowledge`] - per-word confidence and New/Exposed/Learning/Known states
//! - [`user_score`] - rolling comprehension/engagement scores and daily streaks
//! - [`reward`] - XP with a variable-ratio bonus
//! - [`content_metrics`] - per-content engagement counters
//! - [`cache_policy`] - which interactions make a cached feed stale
//! - [`feed`] - candidate scoring, type diversity and the curated fallback
//! - [`sanitize`] - numeric guards
//! - [`types`] - shared enums and constants
//!
//! ## Example
//!
//! ```rust
//! use langfeed_algo::{estimate_comprehension, ComprehensionConfig, InteractionSignals};
//!
//! let signals = InteractionSignals {
//!     completion_rate: Some(1.0),
//!     time_spent_seconds: Some(30.0),
//!     ..InteractionSignals::default()
//! };
//! let score = estimate_comprehension(&signals, &ComprehensionConfig::default());
//! assert!((score - 0.8).abs() < 1e-9);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cache_policy;
pub mod comprehension;
pub mod content_metrics;
pub mod feed;
pub mod reward;
pub mod sanitize;
pub mod types;
pub mod user_score;
pub mod word_knowledge;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use cache_policy::CachePolicy;

pub use comprehension::{estimate_comprehension, ComprehensionConfig};

pub use content_metrics::{apply_delta, delta_for, ContentMetrics, MetricsDelta};

pub use feed::{
    diversify, fallback_page, rank_candidates, rank_candidates_seeded, DifficultyFeedback,
    FeedCandidate, FeedItem, FeedProfile, RankingConfig, ScoreWeights,
};

pub use reward::{BonusTier, Reward, RewardCalculator, RewardConfig};

pub use user_score::{
    advance_streak, apply_activity, engagement_delta, Activity, StreakState, UserProgress,
    UserScoreConfig,
};

pub use word_knowledge::{
    classify, compute_confidence, qualifies_for_exposure, WordCounters, WordKnowledgeConfig,
    WordState,
};
