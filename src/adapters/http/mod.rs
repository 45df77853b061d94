pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, routing::{get, post}, Router};
use tower_http::trace::TraceLayer;
use crate::adapters::http::state::HttpState;

// Límite de subida: imagen + anotaciones.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(routes::read_root))
        .route("/health", get(routes::health_check))
        .route("/api/config", get(routes::get_config))
        .route("/detect/", post(routes::detect_layout))
        .route("/evaluate/", post(routes::evaluate_upload))
        .route("/evaluate/json", post(routes::evaluate_json))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
