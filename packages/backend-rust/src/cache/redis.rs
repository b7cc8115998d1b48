use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::keys::{feed_invalidated_key, feed_key, feed_shifted_key};
use super::{FeedCacheEntry, FeedCacheError, FeedCacheStore};

const TTL_JITTER_RATIO: f64 = 0.1;

/// KEYS: entry, invalidation marker, shift time.
/// ARGV: payload, composed-since millis, ttl seconds.
const PUT_UNLESS_SHIFTED: &str = r#"
  local shifted = redis.call("get", KEYS[3])
  if shifted and tonumber(shifted) >= tonumber(ARGV[2]) then
    return 0
  end
  redis.call("set", KEYS[1], ARGV[1], "EX", ARGV[3])
  redis.call("del", KEYS[2])
  return 1
"#;

/// Entry JSON under `feed:{user}`; staleness is a separate marker key so
/// invalidation never rewrites the entry.
#[derive(Clone)]
pub struct RedisFeedCache {
    connection: MultiplexedConnection,
}

impl RedisFeedCache {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self::new(connection))
    }
}

#[async_trait]
impl FeedCacheStore for RedisFeedCache {
    async fn get(&self, user_id: &str) -> Result<Option<FeedCacheEntry>, FeedCacheError> {
        let mut conn = self.connection.clone();
        let (payload, marker): (Option<String>, Option<String>) = redis::pipe()
            .get(feed_key(user_id))
            .get(feed_invalidated_key(user_id))
            .query_async(&mut conn)
            .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        let mut entry: FeedCacheEntry = serde_json::from_str(&payload)?;
        if let Some(marker) = marker {
            let invalidated_at = DateTime::parse_from_rfc3339(&marker)
                .map(|at| at.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            entry.invalidated_at = Some(invalidated_at);
        }
        Ok(Some(entry))
    }

    async fn put(
        &self,
        entry: &FeedCacheEntry,
        ttl: Duration,
        composed_since: DateTime<Utc>,
    ) -> Result<bool, FeedCacheError> {
        let payload = serde_json::to_string(entry)?;
        let ttl_secs = apply_ttl_jitter(ttl).as_secs().max(1);
        let mut conn = self.connection.clone();

        let stored: i64 = redis::Script::new(PUT_UNLESS_SHIFTED)
            .key(feed_key(&entry.user_id))
            .key(feed_invalidated_key(&entry.user_id))
            .key(feed_shifted_key(&entry.user_id))
            .arg(payload)
            .arg(composed_since.timestamp_millis())
            .arg(ttl_secs)
            .invoke_async(&mut conn)
            .await?;
        Ok(stored == 1)
    }

    async fn invalidate(&self, user_id: &str, ttl: Duration) -> Result<bool, FeedCacheError> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(feed_shifted_key(user_id), Utc::now().timestamp_millis(), ttl_secs)
            .await?;

        let exists: bool = conn.exists(feed_key(user_id)).await?;
        if !exists {
            return Ok(false);
        }

        let written: Option<String> = redis::cmd("SET")
            .arg(feed_invalidated_key(user_id))
            .arg(Utc::now().to_rfc3339())
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(written.is_some())
    }

    async fn is_connected(&self) -> bool {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

fn apply_ttl_jitter(ttl: Duration) -> Duration {
    let base_ms = ttl.as_millis() as f64;
    let mut rng = rand::rng();
    let factor = rng.random_range(1.0 - TTL_JITTER_RATIO..=1.0 + TTL_JITTER_RATIO);
    let jittered_ms = (base_ms * factor).round().max(1.0);
    Duration::from_millis(jittered_ms as u64)
}
