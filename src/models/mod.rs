use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod deck;
mod session;

pub use deck::{DeckSource, DiscoverFilters};
pub use session::{Participant, SavedMovie, Session, SessionStatus, Swipe};

/// Identifier for a movie in the metadata provider's namespace
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct MovieId(pub i64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A movie candidate as returned by search and discover endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    pub release_year: Option<i32>,
}

/// A fully hydrated movie record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub release_year: Option<i32>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub genres: Vec<Genre>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// One page of discover results from the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverPage {
    pub movies: Vec<MovieSummary>,
    pub total_pages: u32,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw movie entry in TMDB search and discover responses
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

/// Paged TMDB response wrapper (search and discover share this shape)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    pub page: u32,
    pub results: Vec<TmdbMovieSummary>,
    pub total_pages: u32,
}

/// TMDB movie details response
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}

/// Extracts the year from a TMDB `release_date` string ("YYYY-MM-DD")
fn release_year(release_date: Option<&str>) -> Option<i32> {
    release_date
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok())
}

impl From<TmdbMovieSummary> for MovieSummary {
    fn from(raw: TmdbMovieSummary) -> Self {
        MovieSummary {
            id: MovieId(raw.id),
            release_year: release_year(raw.release_date.as_deref()),
            title: raw.title,
        }
    }
}

impl From<TmdbPage> for DiscoverPage {
    fn from(page: TmdbPage) -> Self {
        DiscoverPage {
            total_pages: page.total_pages,
            movies: page.results.into_iter().map(MovieSummary::from).collect(),
        }
    }
}

impl From<TmdbMovieDetails> for Movie {
    fn from(raw: TmdbMovieDetails) -> Self {
        Movie {
            id: MovieId(raw.id),
            release_year: release_year(raw.release_date.as_deref()),
            title: raw.title,
            overview: raw.overview,
            poster_path: raw.poster_path,
            genres: raw
                .genres
                .into_iter()
                .map(|g| Genre {
                    id: g.id,
                    name: g.name,
                })
                .collect(),
            vote_average: raw.vote_average,
        }
    }
}
