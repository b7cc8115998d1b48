//! Content sources feeding the composer.
//!
//! Sources are queried concurrently, each under its own timeout. A source
//! that errors or times out contributes nothing; the failure is reported back
//! so the caller can log it.

pub mod catalog;
pub mod http;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

use langfeed_algo::{CefrLevel, FeedCandidate};

use crate::store::StoreError;

pub use catalog::CatalogSource;
pub use http::HttpSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("store error: {0}")]
    Store(StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    pub level: CefrLevel,
    pub interests: Vec<String>,
    pub limit: usize,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<FeedCandidate>, SourceError>;
}

#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: SourceError,
}

#[derive(Debug, Default)]
pub struct SourceBatch {
    pub candidates: Vec<FeedCandidate>,
    pub failures: Vec<SourceFailure>,
}

/// Query every source concurrently and merge in source order. The first
/// occurrence of an id wins.
pub async fn fetch_all(
    sources: &[Arc<dyn ContentSource>],
    query: &CandidateQuery,
    timeout: Duration,
) -> SourceBatch {
    let requests = sources.iter().map(|source| async move {
        let result = match tokio::time::timeout(timeout, source.fetch_candidates(query)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(timeout)),
        };
        (source.name().to_string(), result)
    });

    let mut batch = SourceBatch::default();
    let mut seen = HashSet::new();

    for (name, result) in join_all(requests).await {
        match result {
            Ok(candidates) => {
                for mut candidate in candidates.into_iter().take(query.limit) {
                    if !seen.insert(candidate.id.clone()) {
                        continue;
                    }
                    if candidate.source.is_empty() {
                        candidate.source = name.clone();
                    }
                    batch.candidates.push(candidate);
                }
            }
            Err(error) => batch.failures.push(SourceFailure {
                source: name,
                error,
            }),
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use langfeed_algo::{ContentMetrics, ContentType};

    enum Behavior {
        Items(Vec<&'static str>),
        Fail,
        Hang,
    }

    struct Scripted {
        name: &'static str,
        behavior: Behavior,
    }

    #[async_trait]
    impl ContentSource for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_candidates(
            &self,
            _query: &CandidateQuery,
        ) -> Result<Vec<FeedCandidate>, SourceError> {
            match &self.behavior {
                Behavior::Items(ids) => Ok(ids
                    .iter()
                    .map(|id| FeedCandidate {
                        id: id.to_string(),
                        content_type: ContentType::Video,
                        level: CefrLevel::A1,
                        title: String::new(),
                        source: String::new(),
                        engagement: ContentMetrics::default(),
                        words: Vec::new(),
                        topics: Vec::new(),
                    })
                    .collect()),
                Behavior::Fail => Err(SourceError::Store(StoreError::NotFound("catalog".into()))),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn query() -> CandidateQuery {
        CandidateQuery {
            level: CefrLevel::A1,
            interests: Vec::new(),
            limit: 10,
        }
    }

    #[tokio::test]
    async fn test_failures_contribute_nothing() {
        let sources: Vec<Arc<dyn ContentSource>> = vec![
            Arc::new(Scripted { name: "broken", behavior: Behavior::Fail }),
            Arc::new(Scripted { name: "slow", behavior: Behavior::Hang }),
            Arc::new(Scripted { name: "live", behavior: Behavior::Items(vec!["a", "b"]) }),
        ];

        let batch = fetch_all(&sources, &query(), Duration::from_millis(50)).await;

        let ids: Vec<_> = batch.candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(batch.candidates.iter().all(|c| c.source == "live"));

        let failed: Vec<_> = batch.failures.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(failed, vec!["broken", "slow"]);
        assert!(matches!(batch.failures[1].error, SourceError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first_source() {
        let sources: Vec<Arc<dyn ContentSource>> = vec![
            Arc::new(Scripted { name: "one", behavior: Behavior::Items(vec!["a", "b"]) }),
            Arc::new(Scripted { name: "two", behavior: Behavior::Items(vec!["b", "c"]) }),
        ];

        let batch = fetch_all(&sources, &query(), Duration::from_secs(1)).await;

        let pairs: Vec<_> = batch
            .candidates
            .iter()
            .map(|c| (c.id.as_str(), c.source.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "one"), ("b", "one"), ("c", "two")]);
    }

    #[tokio::test]
    async fn test_no_sources_is_empty() {
        let batch = fetch_all(&[], &query(), Duration::from_secs(1)).await;
        assert!(batch.candidates.is_empty());
        assert!(batch.failures.is_empty());
    }
}
