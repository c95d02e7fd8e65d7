// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempts, rankings, series},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (series, attempts, rankings).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, session store and table).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let series_routes = Router::new()
        .route("/", get(series::list_series))
        .route("/{id}", get(series::get_series));

    let attempt_routes = Router::new()
        .route("/", post(attempts::start_attempt))
        .route(
            "/{series_id}/{test_id}",
            get(attempts::get_attempt).delete(attempts::abandon),
        )
        .route("/{series_id}/{test_id}/answer", post(attempts::answer))
        .route("/{series_id}/{test_id}/next", post(attempts::next))
        .route("/{series_id}/{test_id}/previous", post(attempts::previous))
        .route("/{series_id}/{test_id}/skip", post(attempts::skip))
        .route("/{series_id}/{test_id}/jump", post(attempts::jump))
        .route("/{series_id}/{test_id}/tick", post(attempts::tick))
        .route("/{series_id}/{test_id}/submit", post(attempts::submit));

    let ranking_routes = Router::new()
        .route("/", get(rankings::get_rankings))
        .route("/{test_name}", get(rankings::get_test_rankings));

    Router::new()
        .nest("/api/series", series_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/rankings", ranking_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
