//! Feed Composer policy
//!
//! Candidate scoring, type-diversity ordering and the curated fallback list.
//! Fetching candidates and caching pages are I/O concerns and live with the
//! service; everything here is synchronous.
//!
//! ## Pipeline
//!
//! 1. [`scoring::rank_candidates`] scores every candidate by engagement,
//!    freshness, level fit and vocabulary fit, then sorts (stable).
//! 2. [`diversity::diversify`] reorders the ranking page by page so that no
//!    content type exceeds `max_type_share` of any page.
//! 3. When no live candidates exist, [`fallback::fallback_page`] cycles the
//!    curated list instead.

pub mod diversity;
pub mod fallback;
pub mod scoring;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::content_metrics::ContentMetrics;
use crate::types::{CefrLevel, ContentType, NEUTRAL_SCORE};

pub use diversity::{diversify, type_cap};
pub use fallback::{fallback_page, FALLBACK_FEED};
pub use scoring::{
    difficulty_fit, engagement_score, known_word_share, preferred_level_offset, rank_candidates,
    rank_candidates_seeded, vocabulary_fit,
};

// ==================== Types ====================

/// One item offered by a content source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCandidate {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub level: CefrLevel,
    #[serde(default)]
    pub title: String,
    /// Name of the source that produced the candidate
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub engagement: ContentMetrics,
    /// Vocabulary of the item; empty when the source does not know it
    #[serde(default)]
    pub words: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// A ranked, client-facing feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub level: CefrLevel,
    pub title: String,
    pub source: String,
    pub score: f64,
    pub known_word_share: Option<f64>,
    pub new_words: Vec<String>,
}

/// Explicit difficulty feedback sent with a feed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyFeedback {
    TooEasy,
    TooHard,
    Perfect,
}

impl DifficultyFeedback {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "too_easy" => Some(Self::TooEasy),
            "too_hard" => Some(Self::TooHard),
            "perfect" => Some(Self::Perfect),
            _ => None,
        }
    }

    /// Levels to move the target band by
    pub fn level_shift(self) -> i32 {
        match self {
            Self::TooEasy => 1,
            Self::TooHard => -1,
            Self::Perfect => 0,
        }
    }
}

/// What the composer knows about the learner
#[derive(Debug, Clone, Default)]
pub struct FeedProfile {
    pub level: CefrLevel,
    pub comprehension_score: f64,
    /// Words currently classified as Known
    pub known_words: HashSet<String>,
    pub feedback: Option<DifficultyFeedback>,
}

// ==================== Config ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    pub engagement: f64,
    pub freshness: f64,
    pub difficulty: f64,
    pub vocabulary: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            engagement: 0.30,
            freshness: 0.10,
            difficulty: 0.40,
            vocabulary: 0.20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingConfig {
    pub weights: ScoreWeights,
    /// Largest share of a page one content type may take
    pub max_type_share: f64,
    /// Below this comprehension the learner is kept at their own level
    pub struggle_threshold: f64,
    pub sweet_spot_min: f64,
    pub sweet_spot_max: f64,
    pub too_easy_fit: f64,
    pub too_hard_fit: f64,
    pub unknown_vocabulary_fit: f64,
    pub max_new_words: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            max_type_share: 0.5,
            struggle_threshold: NEUTRAL_SCORE,
            sweet_spot_min: 0.90,
            sweet_spot_max: 0.98,
            too_easy_fit: 0.6,
            too_hard_fit: 0.3,
            unknown_vocabulary_fit: NEUTRAL_SCORE,
            max_new_words: 5,
        }
    }
}
