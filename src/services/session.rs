/// Session lifecycle
///
/// A session moves `lobby -> swiping -> revealed`, driven by short-lived
/// client requests. Every operation here fetches current state from the
/// store, applies the relevant guards, and mutates; nothing session-scoped
/// is cached in process memory, so any stateless handler instance can serve
/// any request.
use std::collections::HashSet;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::SessionStore,
    error::{AppError, AppResult},
    models::{DeckSource, MovieId, Session, SessionStatus},
    services::{
        deck::{DeckBuilder, DEFAULT_DECK_SIZE},
        matches::compute_matches,
        prematch::{compute_prematches, PrematchEntry, PREMATCH_CAP},
    },
};

/// Room code alphabet: uppercase, with visually confusable characters
/// (0/O, 1/I) removed
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Codes are short, so collisions are real; bound the redraw loop
const MAX_CODE_ATTEMPTS: usize = 16;

/// Result of recording one swipe
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SwipeOutcome {
    /// The swiping user has now covered the full deck
    pub completed: bool,
    /// Every participant has covered the full deck; the client is expected
    /// to trigger reveal when it observes this
    pub all_completed: bool,
}

/// Snapshot of a session for polling clients
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub session_id: Uuid,
    pub room_code: String,
    pub status: SessionStatus,
    pub participants: Vec<ParticipantState>,
    pub deck: Vec<MovieId>,
    /// The requesting user's own swipes, empty when no user was given
    pub user_swipes: Vec<UserSwipe>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantState {
    pub user_id: Uuid,
    pub nickname: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSwipe {
    pub movie_id: MovieId,
    pub liked: bool,
}

#[derive(Clone)]
pub struct SessionService {
    store: SessionStore,
    decks: Arc<DeckBuilder>,
    room_code_length: usize,
    max_deck_size: usize,
}

impl SessionService {
    pub fn new(
        store: SessionStore,
        decks: Arc<DeckBuilder>,
        room_code_length: usize,
        max_deck_size: usize,
    ) -> Self {
        Self {
            store,
            decks,
            room_code_length,
            max_deck_size,
        }
    }

    /// Creates a session: builds the deck, draws a unique room code, and
    /// inserts the session with its host as the first participant
    ///
    /// Deck building (and all its provider traffic) completes before any
    /// row is written, so a collaborator failure aborts creation without a
    /// half-created session. An empty deck is a reported error, not a
    /// degenerate session.
    pub async fn create(
        &self,
        host_id: Uuid,
        nickname: &str,
        source: &DeckSource,
        deck_size: Option<usize>,
        exclude: &HashSet<MovieId>,
    ) -> AppResult<Session> {
        let limit = deck_size.unwrap_or(DEFAULT_DECK_SIZE);
        if limit == 0 || limit > self.max_deck_size {
            return Err(AppError::InvalidInput(format!(
                "Deck size must be between 1 and {}",
                self.max_deck_size
            )));
        }

        let deck = self.decks.build(source, limit, exclude).await?;
        if deck.is_empty() {
            return Err(AppError::EmptyDeck);
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_room_code(self.room_code_length);
            if self.store.code_exists(&code).await? {
                tracing::debug!(attempt, "Room code collision, redrawing");
                continue;
            }

            // The existence check races with concurrent creations; the
            // unique constraint is the arbiter, and a violation there just
            // means redraw
            match self
                .store
                .create_session(&code, host_id, nickname, &deck)
                .await
            {
                Ok(session) => {
                    tracing::info!(
                        session_id = %session.id,
                        code = %session.code,
                        deck_size = session.deck.len(),
                        "Session created"
                    );
                    return Ok(session);
                }
                Err(AppError::Database(e)) if is_unique_violation(&e) => {
                    tracing::debug!(attempt, "Room code taken at insert, redrawing");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(
            "Could not generate a unique room code".to_string(),
        ))
    }

    /// Joins a session by room code
    ///
    /// Safe to retry: a user already in the session gets success without a
    /// duplicate row. Late joins (after the host starts) are rejected.
    pub async fn join(&self, code: &str, user_id: Uuid, nickname: &str) -> AppResult<Session> {
        let normalized = code.trim().to_uppercase();
        let session = self
            .store
            .find_session_by_code(&normalized)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No session with code {}", normalized)))?;

        session.ensure_lobby()?;
        self.store
            .add_participant(session.id, user_id, nickname)
            .await?;

        tracing::info!(
            session_id = %session.id,
            user_id = %user_id,
            "Participant joined"
        );

        Ok(session)
    }

    /// Starts the swiping phase; host only, lobby only
    pub async fn start(&self, session_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let session = self.store.find_session(session_id).await?;
        session.ensure_host(user_id)?;
        session.ensure_lobby()?;

        self.transition(&session, SessionStatus::Swiping).await?;

        tracing::info!(session_id = %session_id, "Session started");
        Ok(())
    }

    /// Records one swipe and reports completion
    pub async fn swipe(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        movie_id: MovieId,
        liked: bool,
    ) -> AppResult<SwipeOutcome> {
        let session = self.store.find_session(session_id).await?;
        session.ensure_swiping()?;

        if !session.contains_movie(movie_id) {
            return Err(AppError::InvalidInput(format!(
                "Movie {} is not in this session's deck",
                movie_id
            )));
        }

        let completed = self
            .store
            .record_swipe(&session, user_id, movie_id, liked)
            .await?;

        // Only worth a roster scan once this user has finished
        let all_completed = if completed {
            self.store
                .list_participants(session_id)
                .await?
                .iter()
                .all(|p| p.completed)
        } else {
            false
        };

        tracing::debug!(
            session_id = %session_id,
            user_id = %user_id,
            movie_id = %movie_id,
            liked,
            completed,
            all_completed,
            "Swipe recorded"
        );

        Ok(SwipeOutcome {
            completed,
            all_completed,
        })
    }

    /// Reveals the session, unconditionally and idempotently
    ///
    /// No completion precondition: an early reveal is allowed, and matches
    /// are then computed over whatever swipes exist. Match computation is a
    /// separate read so clients can re-fetch results after the flip.
    pub async fn reveal(&self, session_id: Uuid) -> AppResult<()> {
        let session = self.store.find_session(session_id).await?;

        self.transition(&session, SessionStatus::Revealed).await?;

        if session.status != SessionStatus::Revealed {
            tracing::info!(session_id = %session_id, "Session revealed");
        }

        Ok(())
    }

    /// Applies a status change, enforcing that the lifecycle only moves
    /// forward
    ///
    /// A same-state change is an idempotent no-op, which is what makes
    /// repeated reveal calls safe. Every status write goes through here;
    /// the store setter is never called directly.
    async fn transition(&self, session: &Session, next: SessionStatus) -> AppResult<()> {
        if session.status == next {
            return Ok(());
        }

        if !session.status.can_transition_to(next) {
            return Err(AppError::InvalidState(format!(
                "Session {} cannot move backwards in its lifecycle",
                session.code
            )));
        }

        self.store.update_status(session.id, next).await
    }

    /// Computes the movies every participant liked
    pub async fn matches(&self, session_id: Uuid) -> AppResult<Vec<MovieId>> {
        let session = self.store.find_session(session_id).await?;
        let swipes = self.store.list_swipes(session_id).await?;
        let participants = self.store.list_participants(session_id).await?;
        let participant_ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();

        Ok(compute_matches(&session.deck, &swipes, &participant_ids))
    }

    /// Current session snapshot for polling clients
    pub async fn state(&self, session_id: Uuid, user_id: Option<Uuid>) -> AppResult<SessionState> {
        let session = self.store.find_session(session_id).await?;
        let participants = self.store.list_participants(session_id).await?;

        let user_swipes = match user_id {
            Some(user_id) => self
                .store
                .list_swipes_for_user(session_id, user_id)
                .await?
                .into_iter()
                .map(|s| UserSwipe {
                    movie_id: s.movie_id,
                    liked: s.liked,
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(SessionState {
            session_id: session.id,
            room_code: session.code,
            status: session.status,
            participants: participants
                .into_iter()
                .map(|p| ParticipantState {
                    user_id: p.user_id,
                    nickname: p.nickname,
                    completed: p.completed,
                })
                .collect(),
            deck: session.deck,
            user_swipes,
        })
    }

    /// Watchlist overlaps across the session's participants
    pub async fn prematches(&self, session_id: Uuid) -> AppResult<Vec<PrematchEntry>> {
        let _ = self.store.find_session(session_id).await?;
        let participants = self.store.list_participants(session_id).await?;
        let participant_ids: Vec<Uuid> = participants.iter().map(|p| p.user_id).collect();

        let saved = self.store.list_saved_for_users(&participant_ids).await?;
        Ok(compute_prematches(&saved, PREMATCH_CAP))
    }

    /// Records the movie the group ultimately settled on
    pub async fn record_watched(&self, session_id: Uuid, movie_id: MovieId) -> AppResult<()> {
        let session = self.store.find_session(session_id).await?;
        if !session.contains_movie(movie_id) {
            return Err(AppError::InvalidInput(format!(
                "Movie {} is not in this session's deck",
                movie_id
            )));
        }

        self.store.record_watched(session_id, movie_id).await
    }
}

/// Draws a random room code from the unambiguous alphabet
pub fn generate_room_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
