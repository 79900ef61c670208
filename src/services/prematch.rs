/// Pre-match computation
///
/// Before a session starts swiping, participants' personal watchlists can
/// already overlap. A pre-match is a movie saved by more than one user
/// (not necessarily everyone), ranked by how many distinct users saved it.
/// Same algorithmic shape as match computation, different data source and
/// threshold.
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{MovieId, SavedMovie};

/// How many pre-matches to surface at most
pub const PREMATCH_CAP: usize = 10;

/// A movie saved by two or more users
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PrematchEntry {
    pub movie_id: MovieId,
    pub saver_count: usize,
}

/// Computes cross-user watchlist overlaps
///
/// Saver counts are over distinct users, so duplicate rows for the same
/// (user, movie) pair cannot inflate a ranking. Ties break by movie id for
/// a deterministic order.
pub fn compute_prematches(saved: &[SavedMovie], cap: usize) -> Vec<PrematchEntry> {
    let mut savers: HashMap<MovieId, HashSet<uuid::Uuid>> = HashMap::new();
    for entry in saved {
        savers.entry(entry.movie_id).or_default().insert(entry.user_id);
    }

    let mut overlaps: Vec<PrematchEntry> = savers
        .into_iter()
        .filter(|(_, users)| users.len() > 1)
        .map(|(movie_id, users)| PrematchEntry {
            movie_id,
            saver_count: users.len(),
        })
        .collect();

    overlaps.sort_by(|a, b| {
        b.saver_count
            .cmp(&a.saver_count)
            .then(a.movie_id.cmp(&b.movie_id))
    });
    overlaps.truncate(cap);

    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn saved(user_id: Uuid, movie_id: i64) -> SavedMovie {
        SavedMovie {
            user_id,
            movie_id: MovieId(movie_id),
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn test_requires_more_than_one_saver() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![saved(a, 1), saved(a, 2), saved(b, 2)];

        let overlaps = compute_prematches(&rows, PREMATCH_CAP);
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].movie_id, MovieId(2));
        assert_eq!(overlaps[0].saver_count, 2);
    }

    #[test]
    fn test_ranked_by_descending_saver_count() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            saved(a, 1),
            saved(b, 1),
            saved(a, 2),
            saved(b, 2),
            saved(c, 2),
        ];

        let overlaps = compute_prematches(&rows, PREMATCH_CAP);
        assert_eq!(overlaps[0].movie_id, MovieId(2));
        assert_eq!(overlaps[0].saver_count, 3);
        assert_eq!(overlaps[1].movie_id, MovieId(1));
        assert_eq!(overlaps[1].saver_count, 2);
    }

    #[test]
    fn test_ties_break_by_movie_id() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![saved(a, 9), saved(b, 9), saved(a, 3), saved(b, 3)];

        let overlaps = compute_prematches(&rows, PREMATCH_CAP);
        assert_eq!(overlaps[0].movie_id, MovieId(3));
        assert_eq!(overlaps[1].movie_id, MovieId(9));
    }

    #[test]
    fn test_cap_is_enforced() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rows = Vec::new();
        for movie in 1..=20 {
            rows.push(saved(a, movie));
            rows.push(saved(b, movie));
        }

        assert_eq!(compute_prematches(&rows, PREMATCH_CAP).len(), PREMATCH_CAP);
    }

    #[test]
    fn test_duplicate_rows_do_not_inflate_counts() {
        let a = Uuid::new_v4();
        let rows = vec![saved(a, 1), saved(a, 1)];

        assert_eq!(compute_prematches(&rows, PREMATCH_CAP), Vec::new());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compute_prematches(&[], PREMATCH_CAP), Vec::new());
    }
}
