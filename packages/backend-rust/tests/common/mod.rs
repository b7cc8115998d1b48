#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use langfeed_algo::{CefrLevel, ContentMetrics, ContentType, FeedCandidate, MetricsDelta, UserScoreConfig};
use langfeed_backend::cache::MemoryFeedCache;
use langfeed_backend::config::EngineConfig;
use langfeed_backend::engine::FeedEngine;
use langfeed_backend::sources::{CandidateQuery, ContentSource, SourceError};
use langfeed_backend::state::{AppState, Backends};
use langfeed_backend::store::{
    ContentRecord, ContentWord, InteractionRecord, LearningStore, MemoryStore, StoreError,
    UserActivity, UserRecord, WordKey, WordKnowledgeRecord,
};

pub async fn create_test_app() -> Router {
    std::env::remove_var("DATABASE_URL");
    std::env::remove_var("REDIS_URL");
    std::env::remove_var("FEED_SOURCE_URLS");

    langfeed_backend::create_app().await
}

pub fn app_for(engine: Arc<FeedEngine>) -> Router {
    langfeed_backend::build_router(AppState::new(engine, Backends::default()))
}

// ============================================================================
// Scripted content sources
// ============================================================================

pub enum Script {
    Items(Vec<FeedCandidate>),
    /// Answers after the delay
    Slow(Duration, Vec<FeedCandidate>),
    Fail,
    Hang,
}

pub struct ScriptedSource {
    name: String,
    script: Script,
    calls: AtomicUsize,
    last_level: Mutex<Option<CefrLevel>>,
}

impl ScriptedSource {
    pub fn new(name: &str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script,
            calls: AtomicUsize::new(0),
            last_level: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Level of the most recent candidate query
    pub fn last_level(&self) -> Option<CefrLevel> {
        *self.last_level.lock()
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<FeedCandidate>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_level.lock() = Some(query.level);
        match &self.script {
            Script::Items(items) => Ok(items.clone()),
            Script::Slow(delay, items) => {
                tokio::time::sleep(*delay).await;
                Ok(items.clone())
            }
            Script::Fail => Err(SourceError::Store(StoreError::Conflict("scripted failure".into()))),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

pub fn candidate(id: &str, content_type: ContentType, level: CefrLevel) -> FeedCandidate {
    FeedCandidate {
        id: id.to_string(),
        content_type,
        level,
        title: format!("title {id}"),
        source: String::new(),
        engagement: ContentMetrics::default(),
        words: Vec::new(),
        topics: Vec::new(),
    }
}

// ============================================================================
// Engine builders
// ============================================================================

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub engine: Arc<FeedEngine>,
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.composer.source_timeout = Duration::from_millis(100);
    config
}

pub fn harness(sources: Vec<Arc<dyn ContentSource>>) -> Harness {
    harness_with(sources, test_config())
}

pub fn harness_with(sources: Vec<Arc<dyn ContentSource>>, config: EngineConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    engine_over(store.clone(), store as Arc<dyn LearningStore>, sources, config)
}

/// Engine reading and writing through `backend`, with `store` kept for assertions
fn engine_over(
    store: Arc<MemoryStore>,
    backend: Arc<dyn LearningStore>,
    sources: Vec<Arc<dyn ContentSource>>,
    config: EngineConfig,
) -> Harness {
    let engine = FeedEngine::new(
        backend,
        Arc::new(MemoryFeedCache::new()),
        sources,
        config,
    )
    .with_reward_seed(7);
    Harness {
        store,
        engine: Arc::new(engine),
    }
}

pub async fn seed_content(store: &MemoryStore, id: &str, words: &[&str]) {
    store
        .upsert_content(&ContentRecord::new(id, ContentType::Video, CefrLevel::A1, id))
        .await
        .unwrap();
    let words: Vec<ContentWord> = words.iter().map(|w| ContentWord::new(id, *w)).collect();
    store.upsert_content_words(&words).await.unwrap();
}

// ============================================================================
// Failing store
// ============================================================================

/// Which write the failing store refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    ContentMetrics,
    UserActivity,
}

/// Memory store that errors on one kind of write and delegates the rest
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    fail_on: FailOn,
}

impl FailingStore {
    fn refused(&self, write: FailOn) -> Result<(), StoreError> {
        if self.fail_on == write {
            return Err(StoreError::Conflict(format!("{write:?} write refused")));
        }
        Ok(())
    }
}

pub fn failing_harness(fail_on: FailOn) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let failing = Arc::new(FailingStore {
        inner: store.clone(),
        fail_on,
    });
    engine_over(store, failing, Vec::new(), test_config())
}

#[async_trait]
impl LearningStore for FailingStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.inner.get_user(user_id).await
    }

    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        self.inner.create_user(user).await
    }

    async fn apply_user_activity(
        &self,
        user_id: &str,
        activity: &UserActivity,
        config: &UserScoreConfig,
    ) -> Result<UserRecord, StoreError> {
        self.refused(FailOn::UserActivity)?;
        self.inner.apply_user_activity(user_id, activity, config).await
    }

    async fn get_content(&self, content_id: &str) -> Result<Option<ContentRecord>, StoreError> {
        self.inner.get_content(content_id).await
    }

    async fn upsert_content(&self, content: &ContentRecord) -> Result<ContentRecord, StoreError> {
        self.inner.upsert_content(content).await
    }

    async fn list_content(
        &self,
        levels: &[CefrLevel],
        limit: usize,
    ) -> Result<Vec<ContentRecord>, StoreError> {
        self.inner.list_content(levels, limit).await
    }

    async fn apply_content_metrics(
        &self,
        content_id: &str,
        delta: &MetricsDelta,
    ) -> Result<ContentRecord, StoreError> {
        self.refused(FailOn::ContentMetrics)?;
        self.inner.apply_content_metrics(content_id, delta).await
    }

    async fn list_content_words(&self, content_id: &str) -> Result<Vec<ContentWord>, StoreError> {
        self.inner.list_content_words(content_id).await
    }

    async fn upsert_content_words(&self, words: &[ContentWord]) -> Result<(), StoreError> {
        self.inner.upsert_content_words(words).await
    }

    async fn get_word_knowledge(
        &self,
        key: &WordKey,
    ) -> Result<Option<WordKnowledgeRecord>, StoreError> {
        self.inner.get_word_knowledge(key).await
    }

    async fn list_word_knowledge(
        &self,
        user_id: &str,
        language: &str,
    ) -> Result<Vec<WordKnowledgeRecord>, StoreError> {
        self.inner.list_word_knowledge(user_id, language).await
    }

    async fn record_word_exposure(
        &self,
        key: &WordKey,
        seen_at: DateTime<Utc>,
    ) -> Result<WordKnowledgeRecord, StoreError> {
        self.inner.record_word_exposure(key, seen_at).await
    }

    async fn record_word_lookup(&self, key: &WordKey) -> Result<WordKnowledgeRecord, StoreError> {
        self.inner.record_word_lookup(key).await
    }

    async fn record_word_review(
        &self,
        key: &WordKey,
        correct: bool,
    ) -> Result<WordKnowledgeRecord, StoreError> {
        self.inner.record_word_review(key, correct).await
    }

    async fn set_word_confidence(&self, key: &WordKey, confidence: f64) -> Result<(), StoreError> {
        self.inner.set_word_confidence(key, confidence).await
    }

    async fn append_interaction(&self, interaction: &InteractionRecord) -> Result<(), StoreError> {
        self.inner.append_interaction(interaction).await
    }

    async fn list_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        self.inner.list_interactions(user_id, limit).await
    }
}
