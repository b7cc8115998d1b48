//! Storage seam for users, content, word knowledge and the interaction log.
//!
//! Every counter increment happens inside a single store operation so
//! concurrent requests never lose an increment. Read-modify-write updates
//! (EMA, running average, streak) are computed by the same `langfeed_algo`
//! functions in every implementation.

pub mod memory;
pub mod migrate;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use langfeed_algo::{
    apply_activity, classify, Activity, CefrLevel, ContentMetrics, ContentType, InteractionSignals,
    InteractionType, MetricsDelta, UserProgress, UserScoreConfig, WordCounters,
    WordKnowledgeConfig, WordState, NEUTRAL_SCORE,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

// ==================== Records ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub current_level: CefrLevel,
    pub comprehension_score: f64,
    pub engagement_score: f64,
    pub total_xp: i64,
    pub streak_days: i32,
    pub longest_streak: i32,
    pub last_active_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// First-contact defaults
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            current_level: CefrLevel::A1,
            comprehension_score: NEUTRAL_SCORE,
            engagement_score: NEUTRAL_SCORE,
            total_xp: 0,
            streak_days: 0,
            longest_streak: 0,
            last_active_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn progress(&self) -> UserProgress {
        UserProgress {
            comprehension_score: self.comprehension_score,
            engagement_score: self.engagement_score,
            total_xp: self.total_xp,
            streak_days: self.streak_days,
            longest_streak: self.longest_streak,
        }
    }

    /// Fold one interaction into the user row
    pub fn with_activity(&self, activity: &UserActivity, config: &UserScoreConfig) -> Self {
        let days_since_last_active = self
            .last_active_on
            .map(|last| (activity.occurred_on - last).num_days());

        let progress = apply_activity(
            &self.progress(),
            &Activity {
                inferred_comprehension: activity.inferred_comprehension,
                engagement_delta: activity.engagement_delta,
                xp_earned: activity.xp_earned,
                days_since_last_active,
            },
            config,
        );

        let last_active_on = match self.last_active_on {
            Some(last) if last > activity.occurred_on => Some(last),
            _ => Some(activity.occurred_on),
        };

        Self {
            comprehension_score: progress.comprehension_score,
            engagement_score: progress.engagement_score,
            total_xp: progress.total_xp,
            streak_days: progress.streak_days,
            longest_streak: progress.longest_streak,
            last_active_on,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Per-user effects of one interaction, applied atomically by the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserActivity {
    pub inferred_comprehension: f64,
    pub engagement_delta: f64,
    pub xp_earned: u32,
    pub occurred_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub level: CefrLevel,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(flatten)]
    pub metrics: ContentMetrics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn new(
        id: impl Into<String>,
        content_type: ContentType,
        level: CefrLevel,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            content_type,
            level,
            title: title.into(),
            topics: Vec::new(),
            metrics: ContentMetrics::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentWord {
    pub content_id: String,
    pub word: String,
    pub lemma: Option<String>,
}

impl ContentWord {
    pub fn new(content_id: impl Into<String>, word: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            word: word.into(),
            lemma: None,
        }
    }
}

/// Identity of a word-knowledge row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordKey {
    pub user_id: String,
    pub language: String,
    pub word: String,
}

impl WordKey {
    /// Words are keyed case-insensitively
    pub fn new(user_id: &str, language: &str, word: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            language: language.to_string(),
            word: word.trim().to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordKnowledgeRecord {
    pub user_id: String,
    pub language: String,
    pub word: String,
    #[serde(flatten)]
    pub counters: WordCounters,
    pub confidence_score: f64,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WordKnowledgeRecord {
    pub fn new(key: &WordKey) -> Self {
        let now = Utc::now();
        Self {
            user_id: key.user_id.clone(),
            language: key.language.clone(),
            word: key.word.clone(),
            counters: WordCounters::default(),
            confidence_score: 0.0,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> WordKey {
        WordKey {
            user_id: self.user_id.clone(),
            language: self.language.clone(),
            word: self.word.clone(),
        }
    }

    pub fn state(&self, config: &WordKnowledgeConfig) -> WordState {
        classify(&self.counters, self.confidence_score, config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub id: String,
    pub user_id: String,
    pub content_id: String,
    pub interaction_type: InteractionType,
    #[serde(flatten)]
    pub signals: InteractionSignals,
    pub word: Option<String>,
    pub inferred_comprehension: f64,
    pub xp_earned: i64,
    pub created_at: DateTime<Utc>,
}

/// Word-knowledge counter increments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordEvent {
    Exposure,
    Lookup,
    Review { correct: bool },
}

impl WordEvent {
    pub fn apply(self, counters: &mut WordCounters) {
        match self {
            Self::Exposure => counters.exposure_count += 1,
            Self::Lookup => counters.lookup_count += 1,
            Self::Review { correct: true } => counters.correct_reviews += 1,
            Self::Review { correct: false } => counters.incorrect_reviews += 1,
        }
    }
}

// ==================== Repository ====================

#[async_trait]
pub trait LearningStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert if absent; returns whatever row is stored afterwards
    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError>;

    async fn apply_user_activity(
        &self,
        user_id: &str,
        activity: &UserActivity,
        config: &UserScoreConfig,
    ) -> Result<UserRecord, StoreError>;

    async fn get_content(&self, content_id: &str) -> Result<Option<ContentRecord>, StoreError>;

    /// Creates or updates descriptive fields; counters are never overwritten
    async fn upsert_content(&self, content: &ContentRecord) -> Result<ContentRecord, StoreError>;

    async fn list_content(
        &self,
        levels: &[CefrLevel],
        limit: usize,
    ) -> Result<Vec<ContentRecord>, StoreError>;

    async fn apply_content_metrics(
        &self,
        content_id: &str,
        delta: &MetricsDelta,
    ) -> Result<ContentRecord, StoreError>;

    async fn list_content_words(&self, content_id: &str) -> Result<Vec<ContentWord>, StoreError>;

    async fn upsert_content_words(&self, words: &[ContentWord]) -> Result<(), StoreError>;

    async fn get_word_knowledge(
        &self,
        key: &WordKey,
    ) -> Result<Option<WordKnowledgeRecord>, StoreError>;

    async fn list_word_knowledge(
        &self,
        user_id: &str,
        language: &str,
    ) -> Result<Vec<WordKnowledgeRecord>, StoreError>;

    async fn record_word_exposure(
        &self,
        key: &WordKey,
        seen_at: DateTime<Utc>,
    ) -> Result<WordKnowledgeRecord, StoreError>;

    async fn record_word_lookup(&self, key: &WordKey) -> Result<WordKnowledgeRecord, StoreError>;

    async fn record_word_review(
        &self,
        key: &WordKey,
        correct: bool,
    ) -> Result<WordKnowledgeRecord, StoreError>;

    /// Derived value; last writer wins
    async fn set_word_confidence(&self, key: &WordKey, confidence: f64) -> Result<(), StoreError>;

    async fn append_interaction(&self, interaction: &InteractionRecord) -> Result<(), StoreError>;

    /// Newest first
    async fn list_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, StoreError>;
}
