use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{FeedCacheEntry, FeedCacheError, FeedCacheStore};

#[derive(Default)]
struct UserSlot {
    entry: Option<FeedCacheEntry>,
    /// Most recent preference shift
    shifted_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryFeedCache {
    slots: RwLock<HashMap<String, UserSlot>>,
}

impl MemoryFeedCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedCacheStore for MemoryFeedCache {
    async fn get(&self, user_id: &str) -> Result<Option<FeedCacheEntry>, FeedCacheError> {
        Ok(self
            .slots
            .read()
            .get(user_id)
            .and_then(|slot| slot.entry.clone()))
    }

    async fn put(
        &self,
        entry: &FeedCacheEntry,
        _ttl: Duration,
        composed_since: DateTime<Utc>,
    ) -> Result<bool, FeedCacheError> {
        let mut slots = self.slots.write();
        let slot = slots.entry(entry.user_id.clone()).or_default();
        if slot.shifted_at.is_some_and(|at| at >= composed_since) {
            return Ok(false);
        }
        slot.entry = Some(entry.clone());
        Ok(true)
    }

    async fn invalidate(&self, user_id: &str, _ttl: Duration) -> Result<bool, FeedCacheError> {
        let now = Utc::now();
        let mut slots = self.slots.write();
        let slot = slots.entry(user_id.to_string()).or_default();
        slot.shifted_at = Some(now);
        match slot.entry.as_mut() {
            Some(entry) if entry.invalidated_at.is_none() => {
                entry.invalidated_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
