use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::SessionStore,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{providers::MovieProvider, session::SessionService},
};

pub mod movies;
pub mod sessions;
pub mod users;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub store: SessionStore,
    pub provider: Arc<dyn MovieProvider>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create))
        .route("/sessions/join", post(sessions::join))
        .route("/sessions/:id", get(sessions::state))
        .route("/sessions/:id/start", post(sessions::start))
        .route("/sessions/:id/swipes", post(sessions::swipe))
        .route("/sessions/:id/reveal", post(sessions::reveal))
        .route("/sessions/:id/matches", get(sessions::matches))
        .route("/sessions/:id/prematches", get(sessions::prematches))
        .route("/sessions/:id/watched", post(sessions::record_watched))
        .route(
            "/users/:id/saved",
            post(users::save_movie).get(users::list_saved),
        )
        .route("/movies/search", get(movies::search))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
