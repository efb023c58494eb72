use axum::{routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new().route("/auth/token", post(handlers::issue_token))
}

pub fn announcements() -> Router<AppState> {
    Router::new()
        .route(
            "/announcements",
            get(handlers::list_announcements).post(handlers::create_announcement),
        )
        .route(
            "/announcements/",
            get(handlers::list_announcements).post(handlers::create_announcement),
        )
        .route(
            "/announcements/:id",
            put(handlers::update_announcement).delete(handlers::delete_announcement),
        )
}
