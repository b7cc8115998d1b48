use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use langfeed_algo::DifficultyFeedback;

use crate::engine::FeedRequest;
use crate::response::{ok, parse_body, AppError, QueryParams};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct InvalidateRequest {
    user_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateResponse {
    invalidated: bool,
    changed: bool,
}

pub(super) async fn get_feed(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = feed_request(&QueryParams::from_extractor(query)?)?;
    let page = state.engine().compose_feed(&request).await?;
    Ok(ok(page))
}

/// `userId`, `limit`, `offset`, `interests`, `feedback`, `excludeIds`, `currentContentId`
fn feed_request(query: &QueryParams) -> Result<FeedRequest, AppError> {
    let page_size = query.parse::<i64>("limit")?.unwrap_or(DEFAULT_PAGE_SIZE);
    let page_size = usize::try_from(page_size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| AppError::validation("limit must be a positive integer"))?;
    let offset = usize::try_from(query.parse::<i64>("offset")?.unwrap_or(0))
        .map_err(|_| AppError::validation("offset must not be negative"))?;

    let feedback = query
        .text("feedback")
        .map(|raw| {
            DifficultyFeedback::parse(raw).ok_or_else(|| {
                AppError::validation("feedback must be one of too_easy, too_hard, perfect")
            })
        })
        .transpose()?;

    let mut exclude_ids = query.list("excludeIds");
    if let Some(current) = query.text("currentContentId") {
        exclude_ids.push(current.to_string());
    }

    Ok(FeedRequest {
        user_id: query.text("userId").unwrap_or_default().to_string(),
        page_size,
        offset,
        interests: query.list("interests"),
        feedback,
        exclude_ids,
    })
}

pub(super) async fn invalidate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: InvalidateRequest = parse_body(&body)?;
    let changed = state.engine().invalidate_user_feed(&request.user_id).await?;
    Ok(ok(InvalidateResponse {
        invalidated: true,
        changed,
    }))
}
