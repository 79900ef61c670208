/// Match computation
///
/// A movie matches when every participant's stored swipe for it is a like.
/// The computation is a pure function over the session's swipe ledger and
/// participant roster; it never talks to collaborators, so it can run at any
/// point in the session lifecycle (including an early reveal over a partial
/// ledger).
use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::{MovieId, Swipe};

/// Computes the movies every participant liked, in deck order
///
/// Matching requires an explicit positive swipe from each participant: a
/// participant who never swiped a movie is absent from its likers set, so
/// that movie cannot match. "Nobody disliked it" is not enough.
pub fn compute_matches(
    deck: &[MovieId],
    swipes: &[Swipe],
    participant_ids: &[Uuid],
) -> Vec<MovieId> {
    // An empty roster would make every liked movie match vacuously
    if participant_ids.is_empty() {
        return Vec::new();
    }

    let mut likers: HashMap<MovieId, HashSet<Uuid>> = HashMap::new();
    for swipe in swipes {
        if swipe.liked {
            likers.entry(swipe.movie_id).or_default().insert(swipe.user_id);
        }
    }

    deck.iter()
        .filter(|movie_id| {
            likers
                .get(*movie_id)
                .is_some_and(|l| participant_ids.iter().all(|p| l.contains(p)))
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn swipe(session_id: Uuid, user_id: Uuid, movie_id: i64, liked: bool) -> Swipe {
        Swipe {
            session_id,
            user_id,
            movie_id: MovieId(movie_id),
            liked,
            swiped_at: Utc::now(),
        }
    }

    fn deck(ids: &[i64]) -> Vec<MovieId> {
        ids.iter().copied().map(MovieId).collect()
    }

    #[test]
    fn test_zero_swipes_yields_no_matches() {
        let participants = vec![Uuid::new_v4(), Uuid::new_v4()];
        assert_eq!(
            compute_matches(&deck(&[1, 2, 3]), &[], &participants),
            Vec::<MovieId>::new()
        );
    }

    #[test]
    fn test_full_match_scenario() {
        // 3 participants, 3 movies: all like movie 1, mixed on 2 and 3
        let session = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let swipes = vec![
            swipe(session, a, 1, true),
            swipe(session, a, 2, true),
            swipe(session, a, 3, false),
            swipe(session, b, 1, true),
            swipe(session, b, 2, false),
            swipe(session, b, 3, true),
            swipe(session, c, 1, true),
            swipe(session, c, 2, true),
            swipe(session, c, 3, false),
        ];

        let matches = compute_matches(&deck(&[1, 2, 3]), &swipes, &[a, b, c]);
        assert_eq!(matches, deck(&[1]));
    }

    #[test]
    fn test_disjoint_likes_yield_no_matches() {
        let session = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let swipes = vec![
            swipe(session, a, 1, true),
            swipe(session, a, 2, false),
            swipe(session, b, 1, false),
            swipe(session, b, 2, true),
        ];

        assert_eq!(
            compute_matches(&deck(&[1, 2]), &swipes, &[a, b]),
            Vec::<MovieId>::new()
        );
    }

    #[test]
    fn test_solo_session_matches_own_likes() {
        let session = Uuid::new_v4();
        let a = Uuid::new_v4();

        let swipes = vec![
            swipe(session, a, 1, true),
            swipe(session, a, 2, true),
            swipe(session, a, 3, false),
        ];

        assert_eq!(
            compute_matches(&deck(&[1, 2, 3]), &swipes, &[a]),
            deck(&[1, 2])
        );
    }

    #[test]
    fn test_unswiped_movie_cannot_match() {
        // b liked movie 1 but never swiped movie 2; a liked both
        let session = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let swipes = vec![
            swipe(session, a, 1, true),
            swipe(session, a, 2, true),
            swipe(session, b, 1, true),
        ];

        assert_eq!(compute_matches(&deck(&[1, 2]), &swipes, &[a, b]), deck(&[1]));
    }

    #[test]
    fn test_non_swiping_participant_suppresses_all_matches() {
        let session = Uuid::new_v4();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let swipes = vec![
            swipe(session, a, 1, true),
            swipe(session, a, 2, true),
            swipe(session, b, 1, true),
            swipe(session, b, 2, true),
            // c joined but never swiped
        ];

        assert_eq!(
            compute_matches(&deck(&[1, 2]), &swipes, &[a, b, c]),
            Vec::<MovieId>::new()
        );
    }

    #[test]
    fn test_swipe_order_does_not_affect_matches() {
        let session = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut swipes = vec![
            swipe(session, a, 1, true),
            swipe(session, a, 2, false),
            swipe(session, b, 1, true),
            swipe(session, b, 2, true),
        ];

        let expected = compute_matches(&deck(&[1, 2]), &swipes, &[a, b]);

        swipes.reverse();
        assert_eq!(compute_matches(&deck(&[1, 2]), &swipes, &[a, b]), expected);

        swipes.swap(0, 2);
        assert_eq!(compute_matches(&deck(&[1, 2]), &swipes, &[a, b]), expected);
    }

    #[test]
    fn test_matches_follow_deck_order() {
        let session = Uuid::new_v4();
        let a = Uuid::new_v4();

        let swipes = vec![
            swipe(session, a, 3, true),
            swipe(session, a, 1, true),
            swipe(session, a, 2, true),
        ];

        assert_eq!(
            compute_matches(&deck(&[2, 3, 1]), &swipes, &[a]),
            deck(&[2, 3, 1])
        );
    }

    #[test]
    fn test_empty_roster_yields_no_matches() {
        let session = Uuid::new_v4();
        let a = Uuid::new_v4();
        let swipes = vec![swipe(session, a, 1, true)];

        assert_eq!(
            compute_matches(&deck(&[1]), &swipes, &[]),
            Vec::<MovieId>::new()
        );
    }
}
