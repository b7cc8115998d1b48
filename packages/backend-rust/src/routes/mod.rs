mod feed;
mod health;
mod interactions;
mod users;
mod words;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/interactions",
            post(interactions::record)
                .get(interactions::history)
                .fallback(fallback_handler),
        )
        .route("/api/feed", get(feed::get_feed).fallback(fallback_handler))
        .route(
            "/api/feed/invalidate",
            post(feed::invalidate).fallback(fallback_handler),
        )
        .route(
            "/api/words/review",
            post(words::review).fallback(fallback_handler),
        )
        .route(
            "/api/users/:user_id/progress",
            get(users::progress).fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
