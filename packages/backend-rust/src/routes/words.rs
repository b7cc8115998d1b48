use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::response::{ok, parse_body, AppError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    word: String,
    correct: bool,
}

pub(super) async fn review(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let request: ReviewRequest = parse_body(&body)?;
    let outcome = state
        .engine()
        .record_word_review(&request.user_id, &request.word, request.correct)
        .await?;
    Ok(ok(outcome))
}
