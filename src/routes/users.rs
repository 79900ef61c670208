use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{MovieId, SavedMovie},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SaveMovieRequest {
    pub movie_id: MovieId,
}

/// Handler for adding a movie to a user's watchlist
pub async fn save_movie(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<SaveMovieRequest>,
) -> AppResult<StatusCode> {
    state.store.save_movie(user_id, request.movie_id).await?;
    Ok(StatusCode::CREATED)
}

/// Handler for listing a user's watchlist
pub async fn list_saved(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<SavedMovie>>> {
    let saved = state.store.list_saved(user_id).await?;
    Ok(Json(saved))
}
