use axum::{routing::get, routing::post, Router};
use tower_http::services::ServeDir;

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
}

pub fn scans() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(handlers::upload_scan))
        .route("/api/scans", get(handlers::list_scans))
        .route("/api/scans/:id", get(handlers::get_scan))
        .route("/api/analytics", get(handlers::analytics))
}

pub fn media(state: &AppState) -> Router<AppState> {
    Router::new().nest_service("/media", ServeDir::new(state.media.root()))
}
