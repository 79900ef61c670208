use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{MovieId, Participant, SavedMovie, Session, SessionStatus, Swipe},
};

/// Persistence layer for sessions, participants, swipes, and watchlists
///
/// All session state lives in Postgres so any stateless request handler can
/// serve any session. Methods that must be race-free against concurrent
/// requests (swipe recording) run inside a transaction.
#[derive(Clone)]
pub struct SessionStore {
    pool: PgPool,
}

impl SessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a room code is already taken
    pub async fn code_exists(&self, code: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sessions WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Inserts a new session in `lobby` status together with its host
    /// participant, atomically.
    pub async fn create_session(
        &self,
        code: &str,
        host_id: Uuid,
        host_nickname: &str,
        deck: &[MovieId],
    ) -> AppResult<Session> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, code, host_id, status, deck)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, code, host_id, status, deck, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(host_id)
        .bind(SessionStatus::Lobby)
        .bind(deck)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO participants (session_id, user_id, nickname)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(session.id)
        .bind(host_id)
        .bind(host_nickname)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    /// Fetches a session by id, or NotFound
    pub async fn find_session(&self, session_id: Uuid) -> AppResult<Session> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, code, host_id, status, deck, created_at, updated_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Session {} does not exist", session_id)))
    }

    /// Fetches a session by room code (codes are stored uppercase)
    pub async fn find_session_by_code(&self, code: &str) -> AppResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, code, host_id, status, deck, created_at, updated_at
            FROM sessions
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// Adds a participant, idempotently: re-joining is a no-op, not an error
    pub async fn add_participant(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        nickname: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO participants (session_id, user_id, nickname)
            VALUES ($1, $2, $3)
            ON CONFLICT (session_id, user_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(nickname)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All participants of a session, in join order
    pub async fn list_participants(&self, session_id: Uuid) -> AppResult<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT session_id, user_id, nickname, completed, joined_at
            FROM participants
            WHERE session_id = $1
            ORDER BY joined_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(participants)
    }

    /// Sets the session status; transition legality is the caller's concern
    pub async fn update_status(&self, session_id: Uuid, status: SessionStatus) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET status = $2, updated_at = now() WHERE id = $1")
            .bind(session_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Upserts a swipe and recomputes the participant's completion flag
    ///
    /// Runs in one transaction with the participant row locked, so two
    /// near-simultaneous swipes from the same user serialize: the count is
    /// recomputed after every upsert rather than incremented, and the
    /// conflict target collapses a re-swipe into an update of `liked`.
    /// Swipes from different users touch different participant rows and
    /// proceed independently.
    ///
    /// Returns whether the participant has now swiped the full deck.
    pub async fn record_swipe(
        &self,
        session: &Session,
        user_id: Uuid,
        movie_id: MovieId,
        liked: bool,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT session_id, user_id, nickname, completed, joined_at
            FROM participants
            WHERE session_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(session.id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden("User is not a participant in this session".to_string())
        })?;

        sqlx::query(
            r#"
            INSERT INTO swipes (session_id, user_id, movie_id, liked)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (session_id, user_id, movie_id)
            DO UPDATE SET liked = EXCLUDED.liked, swiped_at = now()
            "#,
        )
        .bind(session.id)
        .bind(user_id)
        .bind(movie_id)
        .bind(liked)
        .execute(&mut *tx)
        .await?;

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM swipes WHERE session_id = $1 AND user_id = $2")
                .bind(session.id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        let completed = count as usize >= session.deck.len();
        if completed && !participant.completed {
            sqlx::query(
                "UPDATE participants SET completed = true WHERE session_id = $1 AND user_id = $2",
            )
            .bind(session.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(completed)
    }

    /// The full swipe ledger for a session
    pub async fn list_swipes(&self, session_id: Uuid) -> AppResult<Vec<Swipe>> {
        let swipes = sqlx::query_as::<_, Swipe>(
            r#"
            SELECT session_id, user_id, movie_id, liked, swiped_at
            FROM swipes
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(swipes)
    }

    /// One user's swipes within a session
    pub async fn list_swipes_for_user(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Vec<Swipe>> {
        let swipes = sqlx::query_as::<_, Swipe>(
            r#"
            SELECT session_id, user_id, movie_id, liked, swiped_at
            FROM swipes
            WHERE session_id = $1 AND user_id = $2
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(swipes)
    }

    /// Adds a movie to a user's personal watchlist, idempotently
    pub async fn save_movie(&self, user_id: Uuid, movie_id: MovieId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO saved_movies (user_id, movie_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, movie_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// A user's saved movies, oldest first
    pub async fn list_saved(&self, user_id: Uuid) -> AppResult<Vec<SavedMovie>> {
        let saved = sqlx::query_as::<_, SavedMovie>(
            r#"
            SELECT user_id, movie_id, saved_at
            FROM saved_movies
            WHERE user_id = $1
            ORDER BY saved_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(saved)
    }

    /// Saved movies across a set of users, for pre-match computation
    pub async fn list_saved_for_users(&self, user_ids: &[Uuid]) -> AppResult<Vec<SavedMovie>> {
        let saved = sqlx::query_as::<_, SavedMovie>(
            r#"
            SELECT user_id, movie_id, saved_at
            FROM saved_movies
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(saved)
    }

    /// Records the movie a session's group ultimately settled on
    pub async fn record_watched(&self, session_id: Uuid, movie_id: MovieId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO watched_movies (id, session_id, movie_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(movie_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
