use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::MovieId;

/// Lifecycle states of a matching session
///
/// Transitions are monotonic: `lobby -> swiping -> revealed`. There is no
/// path backwards and `revealed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
pub enum SessionStatus {
    Lobby,
    Swiping,
    Revealed,
}

impl SessionStatus {
    /// Position in the lifecycle ordering
    fn rank(self) -> u8 {
        match self {
            SessionStatus::Lobby => 0,
            SessionStatus::Swiping => 1,
            SessionStatus::Revealed => 2,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    ///
    /// Forward moves only: reveal may skip the swiping phase (a host can
    /// reveal a session that never started), but nothing moves backwards
    /// and a state never re-enters itself.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        self.rank() < next.rank()
    }
}

/// A group matching round
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    /// Short human-typeable room code, stored uppercase
    pub code: String,
    pub host_id: Uuid,
    pub status: SessionStatus,
    /// Ordered movie deck, fixed at creation
    pub deck: Vec<MovieId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Guard: the session must still be in the lobby
    pub fn ensure_lobby(&self) -> AppResult<()> {
        if self.status != SessionStatus::Lobby {
            return Err(AppError::InvalidState(format!(
                "Session {} has already started",
                self.code
            )));
        }
        Ok(())
    }

    /// Guard: the session must be in the swiping phase
    pub fn ensure_swiping(&self) -> AppResult<()> {
        if self.status != SessionStatus::Swiping {
            return Err(AppError::InvalidState(format!(
                "Session {} is not accepting swipes",
                self.code
            )));
        }
        Ok(())
    }

    /// Guard: only the host may perform the operation
    pub fn ensure_host(&self, user_id: Uuid) -> AppResult<()> {
        if self.host_id != user_id {
            return Err(AppError::Forbidden(
                "Only the session host may start the session".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the given movie belongs to this session's deck
    pub fn contains_movie(&self, movie_id: MovieId) -> bool {
        self.deck.contains(&movie_id)
    }
}

/// A user's membership in a session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub nickname: String,
    /// True once the participant has swiped every movie in the deck
    pub completed: bool,
    pub joined_at: DateTime<Utc>,
}

/// One user's verdict on one movie within one session
///
/// Keyed by `(session_id, user_id, movie_id)`; re-swiping the same movie
/// overwrites `liked` in place rather than creating a second row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Swipe {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub movie_id: MovieId,
    pub liked: bool,
    pub swiped_at: DateTime<Utc>,
}

/// A movie on a user's personal watchlist, outside any session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SavedMovie {
    pub user_id: Uuid,
    pub movie_id: MovieId,
    pub saved_at: DateTime<Utc>,
}
