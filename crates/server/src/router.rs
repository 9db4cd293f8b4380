use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Upper bound on an uploaded source PDF.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route(
            "/generate",
            post(handlers::generate_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/download", get(handlers::download_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
