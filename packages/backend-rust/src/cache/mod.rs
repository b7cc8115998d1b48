//! Per-user cache of the last composed feed ranking.
//!
//! Invalidation marks an entry stale instead of deleting it, and reports no
//! change when the entry is already stale or absent. Every invalidation also
//! records when the preference shift happened, so a composition that started
//! before it can never overwrite it with an outdated ranking.

pub mod keys;
pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use langfeed_algo::{CachePolicy, FeedItem, InteractionType};

pub use self::memory::MemoryFeedCache;
pub use self::redis::RedisFeedCache;

#[derive(Debug, thiserror::Error)]
pub enum FeedCacheError {
    #[error(transparent)]
    Redis(#[from] ::redis::RedisError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Request parameters a cached ranking was composed for. A ranking is only
/// reused for requests with the same shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedShape {
    pub page_size: usize,
    pub interests: Vec<String>,
}

impl FeedShape {
    pub fn new(page_size: usize, interests: &[String]) -> Self {
        let mut interests: Vec<String> = interests
            .iter()
            .map(|topic| topic.trim().to_lowercase())
            .filter(|topic| !topic.is_empty())
            .collect();
        interests.sort();
        interests.dedup();
        Self {
            page_size,
            interests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCacheEntry {
    pub user_id: String,
    pub token: String,
    #[serde(default)]
    pub shape: FeedShape,
    pub items: Vec<FeedItem>,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl FeedCacheEntry {
    pub fn new(user_id: &str, shape: FeedShape, items: Vec<FeedItem>, ttl: Duration) -> Self {
        let computed_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Self {
            user_id: user_id.to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            shape,
            items,
            computed_at,
            expires_at: computed_at + ttl,
            invalidated_at: None,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.invalidated_at.is_none() && now < self.expires_at
    }
}

#[async_trait]
pub trait FeedCacheStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<FeedCacheEntry>, FeedCacheError>;

    /// Replaces the entry and clears its invalidation, unless the user's feed
    /// was invalidated at or after `composed_since`. Returns whether it stored.
    async fn put(
        &self,
        entry: &FeedCacheEntry,
        ttl: Duration,
        composed_since: DateTime<Utc>,
    ) -> Result<bool, FeedCacheError>;

    /// Marks the entry stale and records the shift time even when no entry
    /// exists. Returns whether a fresh entry became stale.
    async fn invalidate(&self, user_id: &str, ttl: Duration) -> Result<bool, FeedCacheError>;

    /// Whether the backing service answers
    async fn is_connected(&self) -> bool {
        true
    }
}

#[derive(Clone)]
pub struct FeedCacheController {
    store: Arc<dyn FeedCacheStore>,
    policy: CachePolicy,
}

impl FeedCacheController {
    pub fn new(store: Arc<dyn FeedCacheStore>, policy: CachePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.policy.ttl_secs)
    }

    /// Invalidates when the interaction signals a preference shift. Returns
    /// whether the policy fired, regardless of prior cache state.
    pub async fn on_interaction(
        &self,
        user_id: &str,
        interaction_type: &InteractionType,
    ) -> Result<bool, FeedCacheError> {
        if !self.policy.should_invalidate(interaction_type) {
            return Ok(false);
        }
        let changed = self.invalidate(user_id).await?;
        tracing::debug!(user_id, interaction_type = interaction_type.as_str(), changed, "feed cache invalidated");
        Ok(true)
    }

    pub async fn invalidate(&self, user_id: &str) -> Result<bool, FeedCacheError> {
        self.store.invalidate(user_id, self.ttl()).await
    }

    pub async fn is_connected(&self) -> bool {
        self.store.is_connected().await
    }

    pub async fn is_valid(&self, user_id: &str) -> Result<bool, FeedCacheError> {
        Ok(self.load(user_id).await?.is_some())
    }

    /// The cached entry, only while it is neither expired nor invalidated
    pub async fn load(&self, user_id: &str) -> Result<Option<FeedCacheEntry>, FeedCacheError> {
        let now = Utc::now();
        Ok(self
            .store
            .get(user_id)
            .await?
            .filter(|entry| entry.is_fresh(now)))
    }

    /// Caches a ranking composed from data read at or after `composed_since`.
    /// Returns `None` when a preference shift arrived in the meantime.
    pub async fn store(
        &self,
        user_id: &str,
        shape: FeedShape,
        items: Vec<FeedItem>,
        composed_since: DateTime<Utc>,
    ) -> Result<Option<FeedCacheEntry>, FeedCacheError> {
        let entry = FeedCacheEntry::new(user_id, shape, items, self.ttl());
        if self.store.put(&entry, self.ttl(), composed_since).await? {
            Ok(Some(entry))
        } else {
            tracing::debug!(user_id, "feed invalidated during composition, not caching");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fill(cache: &FeedCacheController, user_id: &str) {
        let stored = cache
            .store(user_id, FeedShape::default(), Vec::new(), Utc::now())
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    fn controller(ttl_secs: u64) -> FeedCacheController {
        FeedCacheController::new(
            Arc::new(MemoryFeedCache::new()),
            CachePolicy {
                ttl_secs,
                ..CachePolicy::default()
            },
        )
    }

    #[tokio::test]
    async fn test_invalidate_twice_is_noop() {
        let cache = controller(60);
        fill(&cache, "u1").await;

        assert!(cache.invalidate("u1").await.unwrap());
        let after_first = cache.store.get("u1").await.unwrap();

        assert!(!cache.invalidate("u1").await.unwrap());
        let after_second = cache.store.get("u1").await.unwrap();
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_invalidate_missing_entry() {
        let cache = controller(60);
        assert!(!cache.invalidate("nobody").await.unwrap());
        assert!(!cache.is_valid("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidation_visible_to_next_load() {
        let cache = controller(60);
        fill(&cache, "u1").await;
        assert!(cache.is_valid("u1").await.unwrap());

        assert!(cache
            .on_interaction("u1", &InteractionType::SwipeLeft)
            .await
            .unwrap());
        assert!(cache.load("u1").await.unwrap().is_none());

        fill(&cache, "u1").await;
        assert!(cache.is_valid("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_preference_interactions_leave_cache() {
        let cache = controller(60);
        fill(&cache, "u1").await;
        assert!(!cache
            .on_interaction("u1", &InteractionType::Completed)
            .await
            .unwrap());
        assert!(cache.is_valid("u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_ttl_entry_is_never_fresh() {
        let cache = controller(0);
        fill(&cache, "u1").await;
        assert!(cache.load("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shift_during_composition_blocks_store() {
        let cache = controller(60);
        let composed_since = Utc::now();

        // No entry yet: nothing changes, but the shift is remembered
        assert!(!cache.invalidate("u1").await.unwrap());

        let stored = cache
            .store("u1", FeedShape::default(), Vec::new(), composed_since)
            .await
            .unwrap();
        assert!(stored.is_none());
        assert!(!cache.is_valid("u1").await.unwrap());

        fill(&cache, "u1").await;
        assert!(cache.is_valid("u1").await.unwrap());
    }

    #[test]
    fn test_shape_normalizes_interests() {
        let a = FeedShape::new(10, &["Music".to_string(), " travel ".to_string(), "music".to_string()]);
        let b = FeedShape::new(10, &["travel".to_string(), "music".to_string()]);
        assert_eq!(a, b);
        assert_ne!(a, FeedShape::new(5, &["travel".to_string(), "music".to_string()]));
    }
}
