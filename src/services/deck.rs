/// Deck building
///
/// Turns a session-creation request into an ordered, deduplicated list of
/// movie ids, bounded by the requested deck size. Three source types are
/// supported: provider discovery under genre/year filters, a scraped URL,
/// and a free-text title list. Output order follows source order with
/// duplicates removed by first occurrence.
use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::{
    error::AppResult,
    models::{DeckSource, DiscoverFilters, MovieId},
    services::{
        providers::{fetch_details_batch, MovieProvider},
        scrape::ScraperChain,
    },
};

/// Deck size used when the creation request does not specify one
pub const DEFAULT_DECK_SIZE: usize = 25;

/// How many discover pages to walk before giving up on filling the deck
const MAX_DISCOVER_PAGES: u32 = 10;

pub struct DeckBuilder {
    provider: Arc<dyn MovieProvider>,
    scraper: ScraperChain,
}

impl DeckBuilder {
    pub fn new(provider: Arc<dyn MovieProvider>, scraper: ScraperChain) -> Self {
        Self { provider, scraper }
    }

    /// Builds a deck from the given source
    ///
    /// Returns up to `limit` distinct movie ids, skipping anything in
    /// `exclude`. An exhausted source yields a short deck, which is not an
    /// error; per-movie detail failures during hydration drop that movie
    /// only. All provider traffic happens here, before any session row is
    /// written.
    pub async fn build(
        &self,
        source: &DeckSource,
        limit: usize,
        exclude: &HashSet<MovieId>,
    ) -> AppResult<Vec<MovieId>> {
        let candidates = match source {
            DeckSource::Filters(filters) => self.from_filters(filters, limit, exclude).await?,
            DeckSource::Url { url } => {
                let titles = self.scraper.scrape(url).await?;
                self.resolve_titles(titles, limit, exclude).await
            }
            DeckSource::TextList { text } => {
                self.resolve_titles(parse_title_list(text), limit, exclude)
                    .await
            }
        };

        // Hydrate through the provider so a dead id never reaches a deck;
        // failures are per-item and order is preserved.
        let movies = fetch_details_batch(&self.provider, &candidates).await;
        let deck: Vec<MovieId> = movies.into_iter().map(|m| m.id).collect();

        tracing::info!(
            requested = limit,
            resolved = candidates.len(),
            deck_size = deck.len(),
            "Deck built"
        );

        Ok(deck)
    }

    /// Walks discover pages until the deck is full, the provider is
    /// exhausted, or the page ceiling is reached
    async fn from_filters(
        &self,
        filters: &DiscoverFilters,
        limit: usize,
        exclude: &HashSet<MovieId>,
    ) -> AppResult<Vec<MovieId>> {
        let mut deck = Vec::with_capacity(limit);
        let mut seen: HashSet<MovieId> = HashSet::new();
        let mut total_pages = u32::MAX;
        let mut page = 1;

        while deck.len() < limit && page <= MAX_DISCOVER_PAGES && page <= total_pages {
            let result = self.provider.discover(filters, page).await?;
            total_pages = result.total_pages;

            for movie in result.movies {
                if deck.len() >= limit {
                    break;
                }
                if exclude.contains(&movie.id) || !seen.insert(movie.id) {
                    continue;
                }
                deck.push(movie.id);
            }

            page += 1;
        }

        Ok(deck)
    }

    /// Resolves title strings to movie ids in input order
    ///
    /// Unresolvable titles (no search results, or a failed search call) are
    /// dropped silently; one bad title never fails the batch.
    async fn resolve_titles(
        &self,
        titles: Vec<String>,
        limit: usize,
        exclude: &HashSet<MovieId>,
    ) -> Vec<MovieId> {
        let mut deck = Vec::with_capacity(limit.min(titles.len()));
        let mut seen: HashSet<MovieId> = HashSet::new();

        for raw in titles {
            if deck.len() >= limit {
                break;
            }

            match self.resolve_title(&raw).await {
                Ok(Some(id)) => {
                    if !exclude.contains(&id) && seen.insert(id) {
                        deck.push(id);
                    }
                }
                Ok(None) => {
                    tracing::debug!(title = %raw, "No search results for title, dropping");
                }
                Err(e) => {
                    tracing::warn!(title = %raw, error = %e, "Title resolution failed, dropping");
                }
            }
        }

        deck
    }

    /// Resolves one title to a movie id
    ///
    /// Prefers an exact case-insensitive title match (plus year match, when
    /// the raw title carries a "(yyyy)" suffix) over the provider's first
    /// result.
    async fn resolve_title(&self, raw: &str) -> AppResult<Option<MovieId>> {
        let (title, year) = split_title_year(raw);
        let candidates = self.provider.search(&title).await?;

        let chosen = candidates
            .iter()
            .find(|c| {
                c.title.eq_ignore_ascii_case(&title) && (year.is_none() || c.release_year == year)
            })
            .or_else(|| candidates.iter().find(|c| c.title.eq_ignore_ascii_case(&title)))
            .or_else(|| candidates.first());

        Ok(chosen.map(|c| c.id))
    }
}

// ============================================================================
// Title-list parsing
// ============================================================================

/// A token that is nothing but a number, optionally with list punctuation
/// ("3", "3.", "12)"), a stray list marker, not a title
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]?$").unwrap());

/// A small leading list marker: 1-3 digits, optional "." or ")", then
/// whitespace and the rest of the token
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}[.)]?\s+(.+)$").unwrap());

/// A trailing parenthesized year: "Heat (1995)"
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*\((\d{4})\)$").unwrap());

/// Splits a free-text blob into candidate titles
///
/// Input is split on newlines and commas; tokens are trimmed, empties and
/// bare numeric list markers are dropped, and a small leading list marker
/// ("1. ", "2) ") is stripped when an actual title follows it. The 1-3
/// digit bound on markers keeps year-prefixed titles such as
/// "2001: A Space Odyssey" intact.
pub fn parse_title_list(text: &str) -> Vec<String> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| !BARE_NUMBER.is_match(token))
        .map(strip_list_marker)
        .collect()
}

fn strip_list_marker(token: &str) -> String {
    if let Some(caps) = LIST_MARKER.captures(token) {
        let rest = caps[1].trim();
        // Only strip when what follows reads as a title; "3. 1984" keeps
        // its marker rather than collapsing to a bare number
        if !rest.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ')') {
            return rest.to_string();
        }
    }
    token.to_string()
}

/// Splits a trailing parenthesized year off a title, when present
fn split_title_year(raw: &str) -> (String, Option<i32>) {
    let trimmed = raw.trim();
    if let Some(caps) = TRAILING_YEAR.captures(trimmed) {
        let title = caps[1].trim();
        if !title.is_empty() {
            return (title.to_string(), caps[2].parse().ok());
        }
    }
    (trimmed.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{DiscoverPage, Genre, Movie, MovieSummary};
    use crate::services::providers::MockMovieProvider;

    // ------------------------------------------------------------------
    // Title-list parsing
    // ------------------------------------------------------------------

    #[test]
    fn test_parse_numbered_list() {
        assert_eq!(
            parse_title_list("1. Movie A\n2. Movie B"),
            vec!["Movie A", "Movie B"]
        );
    }

    #[test]
    fn test_parse_paren_markers_and_plain_markers() {
        assert_eq!(
            parse_title_list("1) Heat\n12 Angry Men"),
            vec!["Heat", "Angry Men"]
        );
    }

    #[test]
    fn test_parse_commas_and_newlines() {
        assert_eq!(parse_title_list("A, B\nC"), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_parse_preserves_year_prefixed_title() {
        assert_eq!(
            parse_title_list("2001: A Space Odyssey"),
            vec!["2001: A Space Odyssey"]
        );
    }

    #[test]
    fn test_parse_preserves_digit_bearing_titles() {
        assert_eq!(
            parse_title_list("Se7en\nOcean's Eleven"),
            vec!["Se7en", "Ocean's Eleven"]
        );
    }

    #[test]
    fn test_parse_drops_bare_numbers() {
        assert_eq!(parse_title_list("3.\nHeat\n12)\n7"), vec!["Heat"]);
    }

    #[test]
    fn test_parse_keeps_marker_before_numeric_title() {
        // Stripping here would leave a bare number, so the token survives whole
        assert_eq!(parse_title_list("3. 1984"), vec!["3. 1984"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse_title_list(""), Vec::<String>::new());
        assert_eq!(parse_title_list("  \n \n,,"), Vec::<String>::new());
    }

    #[test]
    fn test_split_title_year() {
        assert_eq!(split_title_year("Heat (1995)"), ("Heat".to_string(), Some(1995)));
        assert_eq!(split_title_year("Heat"), ("Heat".to_string(), None));
        assert_eq!(split_title_year("(500) Days of Summer"), ("(500) Days of Summer".to_string(), None));
    }

    // ------------------------------------------------------------------
    // Deck building against a mock provider
    // ------------------------------------------------------------------

    fn summary(id: i64, title: &str, year: Option<i32>) -> MovieSummary {
        MovieSummary {
            id: MovieId(id),
            title: title.to_string(),
            release_year: year,
        }
    }

    fn movie(id: MovieId) -> Movie {
        Movie {
            id,
            title: format!("Movie {}", id),
            release_year: Some(2000),
            overview: None,
            poster_path: None,
            genres: Vec::<Genre>::new(),
            vote_average: None,
        }
    }

    fn builder(mock: MockMovieProvider) -> DeckBuilder {
        DeckBuilder::new(Arc::new(mock), ScraperChain::new())
    }

    fn expect_all_details(mock: &mut MockMovieProvider) {
        mock.expect_movie_details().returning(|id| Ok(movie(id)));
    }

    #[tokio::test]
    async fn test_filters_exhausted_source_returns_short_deck() {
        let mut mock = MockMovieProvider::new();
        mock.expect_discover().returning(|_, page| {
            let movies = match page {
                1 => (1..=10).map(|i| summary(i, "A", None)).collect(),
                2 => (11..=18).map(|i| summary(i, "B", None)).collect(),
                _ => panic!("unexpected page {}", page),
            };
            Ok(DiscoverPage {
                movies,
                total_pages: 2,
            })
        });
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::Filters(DiscoverFilters::default()),
                25,
                &HashSet::new(),
            )
            .await
            .unwrap();

        // 18 non-excluded movies exist; asking for 25 is not an error
        assert_eq!(deck.len(), 18);
        assert_eq!(deck[0], MovieId(1));
        assert_eq!(deck[17], MovieId(18));
    }

    #[tokio::test]
    async fn test_filters_respects_exclusion_set() {
        let mut mock = MockMovieProvider::new();
        mock.expect_discover().returning(|_, _| {
            Ok(DiscoverPage {
                movies: (1..=5).map(|i| summary(i, "A", None)).collect(),
                total_pages: 1,
            })
        });
        expect_all_details(&mut mock);

        let exclude: HashSet<MovieId> = [MovieId(2), MovieId(4)].into_iter().collect();
        let deck = builder(mock)
            .build(&DeckSource::Filters(DiscoverFilters::default()), 25, &exclude)
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(1), MovieId(3), MovieId(5)]);
    }

    #[tokio::test]
    async fn test_filters_deduplicates_across_pages() {
        let mut mock = MockMovieProvider::new();
        mock.expect_discover().returning(|_, page| {
            let movies = match page {
                1 => vec![summary(1, "A", None), summary(2, "B", None)],
                _ => vec![summary(2, "B", None), summary(3, "C", None)],
            };
            Ok(DiscoverPage {
                movies,
                total_pages: 2,
            })
        });
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::Filters(DiscoverFilters::default()),
                25,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(1), MovieId(2), MovieId(3)]);
    }

    #[tokio::test]
    async fn test_filters_stops_at_limit() {
        let mut mock = MockMovieProvider::new();
        mock.expect_discover().times(1).returning(|_, _| {
            Ok(DiscoverPage {
                movies: (1..=20).map(|i| summary(i, "A", None)).collect(),
                total_pages: 5,
            })
        });
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::Filters(DiscoverFilters::default()),
                10,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck.len(), 10);
    }

    #[tokio::test]
    async fn test_detail_failure_drops_movie_not_deck() {
        let mut mock = MockMovieProvider::new();
        mock.expect_discover().returning(|_, _| {
            Ok(DiscoverPage {
                movies: vec![
                    summary(1, "A", None),
                    summary(2, "B", None),
                    summary(3, "C", None),
                ],
                total_pages: 1,
            })
        });
        mock.expect_movie_details().returning(|id| {
            if id == MovieId(2) {
                Err(AppError::ExternalApi("boom".to_string()))
            } else {
                Ok(movie(id))
            }
        });

        let deck = builder(mock)
            .build(
                &DeckSource::Filters(DiscoverFilters::default()),
                25,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(1), MovieId(3)]);
    }

    #[tokio::test]
    async fn test_text_list_prefers_exact_title_and_year() {
        let mut mock = MockMovieProvider::new();
        mock.expect_search().returning(|title| {
            assert_eq!(title, "Heat");
            Ok(vec![
                summary(10, "Heat", Some(2020)),
                summary(11, "Heat", Some(1995)),
            ])
        });
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::TextList {
                    text: "Heat (1995)".to_string(),
                },
                25,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(11)]);
    }

    #[tokio::test]
    async fn test_text_list_falls_back_to_first_result() {
        let mut mock = MockMovieProvider::new();
        mock.expect_search()
            .returning(|_| Ok(vec![summary(20, "Ronin: Special Edition", Some(1998))]));
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::TextList {
                    text: "Ronin".to_string(),
                },
                25,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(20)]);
    }

    #[tokio::test]
    async fn test_text_list_drops_unresolved_titles_silently() {
        let mut mock = MockMovieProvider::new();
        mock.expect_search().returning(|title| {
            if title == "Heat" {
                Ok(vec![summary(10, "Heat", Some(1995))])
            } else {
                Ok(vec![])
            }
        });
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::TextList {
                    text: "Heat\nCompletely Unknown Movie".to_string(),
                },
                25,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(10)]);
    }

    #[tokio::test]
    async fn test_text_list_absorbs_single_search_failure() {
        let mut mock = MockMovieProvider::new();
        mock.expect_search().returning(|title| {
            if title == "Heat" {
                Err(AppError::ExternalApi("timeout".to_string()))
            } else {
                Ok(vec![summary(30, "Ronin", Some(1998))])
            }
        });
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::TextList {
                    text: "Heat\nRonin".to_string(),
                },
                25,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(30)]);
    }

    #[tokio::test]
    async fn test_text_list_respects_limit() {
        let mut mock = MockMovieProvider::new();
        mock.expect_search().returning(|title| {
            let id = match title {
                "A" => 1,
                "B" => 2,
                _ => 3,
            };
            Ok(vec![summary(id, title, None)])
        });
        expect_all_details(&mut mock);

        let deck = builder(mock)
            .build(
                &DeckSource::TextList {
                    text: "A\nB\nC".to_string(),
                },
                2,
                &HashSet::new(),
            )
            .await
            .unwrap();

        assert_eq!(deck, vec![MovieId(1), MovieId(2)]);
    }
}
