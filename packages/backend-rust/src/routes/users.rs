use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::response::{ok, AppError};
use crate::state::AppState;

pub(super) async fn progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.engine().get_user(&user_id).await?;
    Ok(ok(user))
}
