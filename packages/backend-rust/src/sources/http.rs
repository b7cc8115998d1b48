use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use langfeed_algo::FeedCandidate;

use super::{CandidateQuery, ContentSource, SourceError};

/// Remote content service exposing `GET {base}/candidates`.
#[derive(Clone)]
pub struct HttpSource {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidatesResponse {
    Bare(Vec<FeedCandidate>),
    Wrapped { candidates: Vec<FeedCandidate> },
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: base_url.clone(),
            base_url,
            client,
        }
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<FeedCandidate>, SourceError> {
        let url = format!("{}/candidates", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("level", query.level.as_str().to_string()),
                ("interests", query.interests.join(",")),
                ("limit", query.limit.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::HttpStatus { status, body });
        }

        let candidates = match resp.json::<CandidatesResponse>().await? {
            CandidatesResponse::Bare(items) => items,
            CandidatesResponse::Wrapped { candidates } => candidates,
        };
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use langfeed_algo::CefrLevel;
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn query() -> CandidateQuery {
        CandidateQuery {
            level: CefrLevel::B1,
            interests: vec!["music".into(), "travel".into()],
            limit: 3,
        }
    }

    #[tokio::test]
    async fn test_fetches_wrapped_candidates() {
        let router = Router::new().route(
            "/candidates",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(params.get("level").map(String::as_str), Some("B1"));
                assert_eq!(params.get("interests").map(String::as_str), Some("music,travel"));
                Json(serde_json::json!({
                    "candidates": [
                        {"id": "remote-1", "type": "video", "level": "B1"},
                        {"id": "remote-2", "type": "music", "level": "B2", "words": ["canción"]}
                    ]
                }))
            }),
        );
        let base = serve(router).await;

        let source = HttpSource::new(&format!("{base}/"), Duration::from_secs(2));
        let candidates = source.fetch_candidates(&query()).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].words, vec!["canción"]);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/candidates",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let base = serve(router).await;

        let source = HttpSource::new(&base, Duration::from_secs(2));
        let err = source.fetch_candidates(&query()).await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::HttpStatus { status, .. } if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
    }
}
