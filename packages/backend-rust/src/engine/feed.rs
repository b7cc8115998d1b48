use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use langfeed_algo::feed::FALLBACK_FEED;
use langfeed_algo::{
    diversify, fallback_page, rank_candidates_seeded, CefrLevel, DifficultyFeedback, FeedItem,
    FeedProfile, WordState,
};

use super::{required, EngineError, FeedEngine};
use crate::cache::FeedShape;
use crate::sources::{fetch_all, CandidateQuery};
use crate::store::UserRecord;

#[derive(Debug, Clone, Default)]
pub struct FeedRequest {
    pub user_id: String,
    pub page_size: usize,
    pub offset: usize,
    pub interests: Vec<String>,
    /// Moves the target difficulty one level; such pages bypass the cache
    pub feedback: Option<DifficultyFeedback>,
    /// Content the client already has on screen
    pub exclude_ids: Vec<String>,
}

impl FeedRequest {
    /// Pages shaped by per-request feedback or exclusions are never cached
    fn is_personalized(&self) -> bool {
        self.feedback.is_some() || !self.exclude_ids.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Length of the full ranking; for fallback pages, the curated list size
    pub total: usize,
    pub offset: usize,
    pub from_cache: bool,
    pub fallback: bool,
}

impl FeedEngine {
    pub async fn compose_feed(&self, request: &FeedRequest) -> Result<FeedPage, EngineError> {
        let user_id = required(&request.user_id, "userId")?;
        let max_page_size = self.config.composer.max_page_size;
        if request.page_size == 0 || request.page_size > max_page_size {
            return Err(EngineError::Validation(format!(
                "pageSize must be between 1 and {max_page_size}"
            )));
        }
        let (page_size, offset) = (request.page_size, request.offset);
        let composed_since = Utc::now();
        let shape = FeedShape::new(page_size, &request.interests);
        let use_cache = !request.is_personalized();

        if use_cache {
            match self.cache.load(user_id).await {
                Ok(Some(entry)) if entry.shape == shape => {
                    tracing::debug!(user_id, token = %entry.token, "serving cached feed");
                    return Ok(FeedPage {
                        total: entry.items.len(),
                        items: slice_page(&entry.items, offset, page_size),
                        offset,
                        from_cache: true,
                        fallback: false,
                    });
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, user_id, "feed cache read failed"),
            }
        }

        let user = self.load_or_create_user(user_id).await;
        let level_shift = request.feedback.map_or(0, DifficultyFeedback::level_shift);
        let query = CandidateQuery {
            level: shift_level(user.current_level, level_shift),
            interests: request.interests.clone(),
            limit: self.config.composer.candidate_pool,
        };
        let batch = fetch_all(&self.sources, &query, self.config.composer.source_timeout).await;
        for failure in batch.failures {
            let err = EngineError::SourceUnavailable {
                name: failure.source,
                reason: failure.error.to_string(),
            };
            tracing::warn!(error = %err, user_id, "content source skipped");
        }

        let excluded: HashSet<&str> = request.exclude_ids.iter().map(String::as_str).collect();
        let candidates: Vec<_> = batch
            .candidates
            .into_iter()
            .filter(|candidate| !excluded.contains(candidate.id.as_str()))
            .collect();

        if candidates.is_empty() {
            tracing::info!(user_id, offset, "no live candidates, serving fallback feed");
            return Ok(FeedPage {
                items: fallback_page(page_size, offset),
                total: FALLBACK_FEED.len(),
                offset,
                from_cache: false,
                fallback: true,
            });
        }

        let profile = FeedProfile {
            level: user.current_level,
            comprehension_score: user.comprehension_score,
            known_words: self.known_words(user_id).await,
            feedback: request.feedback,
        };
        let ranking = &self.config.composer.ranking;
        let ranked = rank_candidates_seeded(candidates, &profile, ranking, rand::random());
        let ordered = diversify(ranked, page_size, ranking.max_type_share);

        let page = FeedPage {
            total: ordered.len(),
            items: slice_page(&ordered, offset, page_size),
            offset,
            from_cache: false,
            fallback: false,
        };

        if use_cache {
            if let Err(err) = self.cache.store(user_id, shape, ordered, composed_since).await {
                tracing::warn!(error = %err, user_id, "feed cache write failed");
            }
        }
        Ok(page)
    }

    async fn load_or_create_user(&self, user_id: &str) -> UserRecord {
        match self.store.get_user(user_id).await {
            Ok(Some(user)) => return user,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, user_id, "user lookup failed, using defaults");
                return UserRecord::new(user_id);
            }
        }
        match self.store.create_user(UserRecord::new(user_id)).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, user_id, "user creation failed, using defaults");
                UserRecord::new(user_id)
            }
        }
    }

    async fn known_words(&self, user_id: &str) -> HashSet<String> {
        match self
            .store
            .list_word_knowledge(user_id, &self.config.language)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .filter(|row| row.state(&self.config.word_knowledge) == WordState::Known)
                .map(|row| row.word)
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, user_id, "word knowledge lookup failed");
                HashSet::new()
            }
        }
    }
}

fn slice_page(items: &[FeedItem], offset: usize, page_size: usize) -> Vec<FeedItem> {
    items.iter().skip(offset).take(page_size).cloned().collect()
}

fn shift_level(level: CefrLevel, shift: i32) -> CefrLevel {
    match shift.cmp(&0) {
        Ordering::Greater => level.step_up(),
        Ordering::Less => level.step_down(),
        Ordering::Equal => level,
    }
}
