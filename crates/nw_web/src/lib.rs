use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/news", get(handlers::get_news))
        .route("/news/archive", get(handlers::get_archive))
        .route("/news/archive/meta", get(handlers::get_archive_meta))
        .layer(cors)
        .with_state(Arc::new(state))
}
