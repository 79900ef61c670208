use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{DeckSource, MovieId},
    routes::AppState,
    services::{
        prematch::PrematchEntry,
        session::{SessionState, SwipeOutcome},
    },
};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub host_id: Uuid,
    pub nickname: String,
    pub source: DeckSource,
    pub deck_size: Option<usize>,
    /// Movies the host has already seen; kept out of the deck
    #[serde(default)]
    pub exclude: Vec<MovieId>,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub room_code: String,
    pub deck_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    pub room_code: String,
    pub user_id: Uuid,
    pub nickname: String,
}

#[derive(Debug, Serialize)]
pub struct JoinSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub user_id: Uuid,
    pub movie_id: MovieId,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MovieId>,
}

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct WatchedRequest {
    pub movie_id: MovieId,
}

/// Handler for session creation
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<CreateSessionResponse>)> {
    tracing::info!(
        request_id = %request_id,
        host_id = %request.host_id,
        "Processing session creation"
    );

    let exclude: HashSet<MovieId> = request.exclude.into_iter().collect();
    let session = state
        .sessions
        .create(
            request.host_id,
            &request.nickname,
            &request.source,
            request.deck_size,
            &exclude,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            room_code: session.code,
            deck_size: session.deck.len(),
        }),
    ))
}

/// Handler for joining a session by room code
pub async fn join(
    State(state): State<AppState>,
    Json(request): Json<JoinSessionRequest>,
) -> AppResult<Json<JoinSessionResponse>> {
    let session = state
        .sessions
        .join(&request.room_code, request.user_id, &request.nickname)
        .await?;

    Ok(Json(JoinSessionResponse {
        session_id: session.id,
    }))
}

/// Handler for the host starting the swiping phase
pub async fn start(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<StartSessionRequest>,
) -> AppResult<StatusCode> {
    state.sessions.start(session_id, request.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for recording a swipe
pub async fn swipe(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SwipeRequest>,
) -> AppResult<Json<SwipeOutcome>> {
    let outcome = state
        .sessions
        .swipe(session_id, request.user_id, request.movie_id, request.liked)
        .await?;
    Ok(Json(outcome))
}

/// Handler for revealing a session
pub async fn reveal(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.sessions.reveal(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for reading the matched movie set
pub async fn matches(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<MatchesResponse>> {
    let matches = state.sessions.matches(session_id).await?;
    Ok(Json(MatchesResponse { matches }))
}

/// Handler for the polled session state read
pub async fn state(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<StateQuery>,
) -> AppResult<Json<SessionState>> {
    let snapshot = state.sessions.state(session_id, params.user_id).await?;
    Ok(Json(snapshot))
}

/// Handler for watchlist overlaps among participants
pub async fn prematches(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<Vec<PrematchEntry>>> {
    let overlaps = state.sessions.prematches(session_id).await?;
    Ok(Json(overlaps))
}

/// Handler for recording the group's final pick
pub async fn record_watched(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<WatchedRequest>,
) -> AppResult<StatusCode> {
    state
        .sessions
        .record_watched(session_id, request.movie_id)
        .await?;
    Ok(StatusCode::CREATED)
}
