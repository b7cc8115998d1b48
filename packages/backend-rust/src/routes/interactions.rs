use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::engine::InteractionInput;
use crate::response::{ok, parse_body, AppError, QueryParams};
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 200;

pub(super) async fn record(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let input: InteractionInput = parse_body(&body)?;
    let outcome = state.engine().record_interaction(input).await?;
    Ok(ok(outcome))
}

pub(super) async fn history(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let query = QueryParams::from_extractor(query)?;
    let limit = query
        .parse::<usize>("limit")?
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let user_id = query.text("userId").unwrap_or_default();
    let rows = state.engine().recent_interactions(user_id, limit).await?;
    Ok(ok(rows))
}
