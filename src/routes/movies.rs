use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{error::AppResult, models::MovieSummary, routes::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
}

/// Handler for movie title search
///
/// Thin passthrough to the metadata provider; deck-source UIs use it to let
/// users check what a title resolves to before building a session.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<MovieSummary>>> {
    let results = state.provider.search(&params.q).await?;
    Ok(Json(results))
}
