//! Adaptive feed engine.
//!
//! Ties the pure policies of `langfeed_algo` to the storage, cache and
//! content-source seams. The engine keeps no per-user state of its own;
//! everything durable goes through [`LearningStore`] and [`FeedCacheStore`].

mod feed;
mod interactions;

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use langfeed_algo::{compute_confidence, RewardCalculator, WordState};

use crate::cache::{FeedCacheController, FeedCacheError, FeedCacheStore};
use crate::config::EngineConfig;
use crate::sources::ContentSource;
use crate::store::{InteractionRecord, LearningStore, StoreError, UserRecord, WordKey, WordKnowledgeRecord};

pub use feed::{FeedPage, FeedRequest};
pub use interactions::{InteractionInput, InteractionOutcome};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("source {name} unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] FeedCacheError),
}

/// Word-knowledge row after a review, with its derived state
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordReviewOutcome {
    #[serde(flatten)]
    pub record: WordKnowledgeRecord,
    pub state: WordState,
}

pub struct FeedEngine {
    store: Arc<dyn LearningStore>,
    cache: FeedCacheController,
    sources: Vec<Arc<dyn ContentSource>>,
    rewards: Mutex<RewardCalculator>,
    config: EngineConfig,
}

impl FeedEngine {
    pub fn new(
        store: Arc<dyn LearningStore>,
        cache_store: Arc<dyn FeedCacheStore>,
        sources: Vec<Arc<dyn ContentSource>>,
        config: EngineConfig,
    ) -> Self {
        let rewards = Mutex::new(RewardCalculator::new(config.reward.clone()));
        let cache = FeedCacheController::new(cache_store, config.cache.clone());
        Self {
            store,
            cache,
            sources,
            rewards,
            config,
        }
    }

    /// Reproducible variable-ratio rewards
    pub fn with_reward_seed(mut self, seed: u64) -> Self {
        self.rewards = Mutex::new(RewardCalculator::with_seed(self.config.reward.clone(), seed));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn LearningStore> {
        &self.store
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub async fn is_cache_connected(&self) -> bool {
        self.cache.is_connected().await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserRecord, EngineError> {
        let user_id = required(user_id, "userId")?;
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }

    /// Idempotent; returns whether a fresh entry was marked stale
    pub async fn invalidate_user_feed(&self, user_id: &str) -> Result<bool, EngineError> {
        let user_id = required(user_id, "userId")?;
        Ok(self.cache.invalidate(user_id).await?)
    }

    pub async fn is_feed_cached(&self, user_id: &str) -> Result<bool, EngineError> {
        let user_id = required(user_id, "userId")?;
        Ok(self.cache.is_valid(user_id).await?)
    }

    pub async fn record_word_review(
        &self,
        user_id: &str,
        word: &str,
        correct: bool,
    ) -> Result<WordReviewOutcome, EngineError> {
        let user_id = required(user_id, "userId")?;
        let word = required(word, "word")?;
        let key = WordKey::new(user_id, &self.config.language, word);

        let mut record = self.store.record_word_review(&key, correct).await?;
        record.confidence_score = self.refresh_confidence(&record).await?;
        let state = record.state(&self.config.word_knowledge);

        tracing::debug!(user_id, word = %key.word, correct, state = state.as_str(), "word review recorded");
        Ok(WordReviewOutcome { record, state })
    }

    pub async fn recent_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, EngineError> {
        let user_id = required(user_id, "userId")?;
        Ok(self.store.list_interactions(user_id, limit).await?)
    }

    /// Recompute confidence from the post-increment counters and persist it
    async fn refresh_confidence(&self, record: &WordKnowledgeRecord) -> Result<f64, StoreError> {
        let confidence = compute_confidence(&record.counters, &self.config.word_knowledge);
        self.store.set_word_confidence(&record.key(), confidence).await?;
        Ok(confidence)
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, EngineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}
