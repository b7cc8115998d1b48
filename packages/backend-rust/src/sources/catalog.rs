use std::sync::Arc;

use async_trait::async_trait;

use langfeed_algo::{CefrLevel, FeedCandidate};

use super::{CandidateQuery, ContentSource, SourceError};
use crate::store::{ContentRecord, LearningStore};

pub const CATALOG_SOURCE: &str = "catalog";

/// Serves the stored content catalog within one CEFR step of the learner.
pub struct CatalogSource {
    store: Arc<dyn LearningStore>,
}

impl CatalogSource {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self { store }
    }
}

fn level_band(level: CefrLevel) -> Vec<CefrLevel> {
    let mut band = vec![level.step_down(), level, level.step_up()];
    band.dedup();
    band
}

#[async_trait]
impl ContentSource for CatalogSource {
    fn name(&self) -> &str {
        CATALOG_SOURCE
    }

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<FeedCandidate>, SourceError> {
        let items = self
            .store
            .list_content(&level_band(query.level), query.limit)
            .await
            .map_err(SourceError::Store)?;

        let mut candidates = Vec::with_capacity(items.len());
        for item in items {
            let words = self
                .store
                .list_content_words(&item.id)
                .await
                .map_err(SourceError::Store)?
                .into_iter()
                .map(|w| w.word.trim().to_lowercase())
                .collect();
            candidates.push(to_candidate(item, words));
        }
        Ok(candidates)
    }
}

fn to_candidate(item: ContentRecord, words: Vec<String>) -> FeedCandidate {
    FeedCandidate {
        id: item.id,
        content_type: item.content_type,
        level: item.level,
        title: item.title,
        source: CATALOG_SOURCE.to_string(),
        engagement: item.metrics,
        words,
        topics: item.topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ContentWord, MemoryStore};
    use langfeed_algo::ContentType;

    #[test]
    fn test_level_band_saturates_at_edges() {
        assert_eq!(level_band(CefrLevel::A1), vec![CefrLevel::A1, CefrLevel::A2]);
        assert_eq!(
            level_band(CefrLevel::B1),
            vec![CefrLevel::A2, CefrLevel::B1, CefrLevel::B2]
        );
        assert_eq!(level_band(CefrLevel::C2), vec![CefrLevel::C1, CefrLevel::C2]);
    }

    #[tokio::test]
    async fn test_catalog_filters_levels_and_attaches_words() {
        let store = Arc::new(MemoryStore::new());
        for (id, level) in [("near", CefrLevel::A2), ("far", CefrLevel::C1)] {
            store
                .upsert_content(&ContentRecord::new(id, ContentType::Article, level, id))
                .await
                .unwrap();
        }
        store
            .upsert_content_words(&[ContentWord::new("near", "Casa"), ContentWord::new("near", "perro")])
            .await
            .unwrap();

        let source = CatalogSource::new(store);
        let candidates = source
            .fetch_candidates(&CandidateQuery {
                level: CefrLevel::A1,
                interests: Vec::new(),
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "near");
        assert_eq!(candidates[0].words, vec!["casa", "perro"]);
        assert_eq!(candidates[0].source, CATALOG_SOURCE);
    }
}
