use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use langfeed_algo::{apply_delta, CefrLevel, MetricsDelta, UserScoreConfig};

use super::{
    ContentRecord, ContentWord, InteractionRecord, LearningStore, StoreError, UserActivity,
    UserRecord, WordEvent, WordKey, WordKnowledgeRecord,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    content: HashMap<String, ContentRecord>,
    content_words: HashMap<String, Vec<ContentWord>>,
    word_knowledge: HashMap<WordKey, WordKnowledgeRecord>,
    interactions: Vec<InteractionRecord>,
}

/// Process-local store. Each operation runs under one lock, which makes every
/// increment atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_word(&self, key: &WordKey, event: WordEvent, seen_at: Option<DateTime<Utc>>) -> WordKnowledgeRecord {
        let mut tables = self.tables.lock();
        let record = tables
            .word_knowledge
            .entry(key.clone())
            .or_insert_with(|| WordKnowledgeRecord::new(key));
        event.apply(&mut record.counters);
        if seen_at.is_some() {
            record.last_seen_at = seen_at;
        }
        record.updated_at = Utc::now();
        record.clone()
    }
}

#[async_trait]
impl LearningStore for MemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.tables.lock().users.get(user_id).cloned())
    }

    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        let mut tables = self.tables.lock();
        let stored = tables.users.entry(user.id.clone()).or_insert(user);
        Ok(stored.clone())
    }

    async fn apply_user_activity(
        &self,
        user_id: &str,
        activity: &UserActivity,
        config: &UserScoreConfig,
    ) -> Result<UserRecord, StoreError> {
        let mut tables = self.tables.lock();
        let user = tables
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserRecord::new(user_id));
        *user = user.with_activity(activity, config);
        Ok(user.clone())
    }

    async fn get_content(&self, content_id: &str) -> Result<Option<ContentRecord>, StoreError> {
        Ok(self.tables.lock().content.get(content_id).cloned())
    }

    async fn upsert_content(&self, content: &ContentRecord) -> Result<ContentRecord, StoreError> {
        let mut tables = self.tables.lock();
        let stored = tables
            .content
            .entry(content.id.clone())
            .and_modify(|existing| {
                existing.content_type = content.content_type;
                existing.level = content.level;
                existing.title = content.title.clone();
                existing.topics = content.topics.clone();
                existing.updated_at = Utc::now();
            })
            .or_insert_with(|| content.clone());
        Ok(stored.clone())
    }

    async fn list_content(
        &self,
        levels: &[CefrLevel],
        limit: usize,
    ) -> Result<Vec<ContentRecord>, StoreError> {
        let tables = self.tables.lock();
        let mut items: Vec<ContentRecord> = tables
            .content
            .values()
            .filter(|c| levels.is_empty() || levels.contains(&c.level))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        items.truncate(limit);
        Ok(items)
    }

    async fn apply_content_metrics(
        &self,
        content_id: &str,
        delta: &MetricsDelta,
    ) -> Result<ContentRecord, StoreError> {
        let mut tables = self.tables.lock();
        let content = tables
            .content
            .get_mut(content_id)
            .ok_or_else(|| StoreError::NotFound(format!("content {content_id}")))?;
        content.metrics = apply_delta(&content.metrics, delta);
        content.updated_at = Utc::now();
        Ok(content.clone())
    }

    async fn list_content_words(&self, content_id: &str) -> Result<Vec<ContentWord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .content_words
            .get(content_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_content_words(&self, words: &[ContentWord]) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        for word in words {
            let entries = tables.content_words.entry(word.content_id.clone()).or_default();
            match entries.iter_mut().find(|existing| existing.word == word.word) {
                Some(existing) => existing.lemma = word.lemma.clone(),
                None => entries.push(word.clone()),
            }
        }
        Ok(())
    }

    async fn get_word_knowledge(
        &self,
        key: &WordKey,
    ) -> Result<Option<WordKnowledgeRecord>, StoreError> {
        Ok(self.tables.lock().word_knowledge.get(key).cloned())
    }

    async fn list_word_knowledge(
        &self,
        user_id: &str,
        language: &str,
    ) -> Result<Vec<WordKnowledgeRecord>, StoreError> {
        let tables = self.tables.lock();
        let mut rows: Vec<WordKnowledgeRecord> = tables
            .word_knowledge
            .values()
            .filter(|r| r.user_id == user_id && r.language == language)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.word.cmp(&b.word));
        Ok(rows)
    }

    async fn record_word_exposure(
        &self,
        key: &WordKey,
        seen_at: DateTime<Utc>,
    ) -> Result<WordKnowledgeRecord, StoreError> {
        Ok(self.bump_word(key, WordEvent::Exposure, Some(seen_at)))
    }

    async fn record_word_lookup(&self, key: &WordKey) -> Result<WordKnowledgeRecord, StoreError> {
        Ok(self.bump_word(key, WordEvent::Lookup, None))
    }

    async fn record_word_review(
        &self,
        key: &WordKey,
        correct: bool,
    ) -> Result<WordKnowledgeRecord, StoreError> {
        Ok(self.bump_word(key, WordEvent::Review { correct }, None))
    }

    async fn set_word_confidence(&self, key: &WordKey, confidence: f64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        let record = tables
            .word_knowledge
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(format!("word {}", key.word)))?;
        record.confidence_score = confidence.clamp(0.0, 1.0);
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn append_interaction(&self, interaction: &InteractionRecord) -> Result<(), StoreError> {
        self.tables.lock().interactions.push(interaction.clone());
        Ok(())
    }

    async fn list_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .interactions
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
