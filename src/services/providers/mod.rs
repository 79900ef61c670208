/// Movie metadata provider abstraction
///
/// This module provides a pluggable architecture for movie metadata sources
/// (TMDB today, others later). A provider covers the three capabilities the
/// deck builder needs: filtered discovery, title search, and per-movie
/// detail lookup.
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{DiscoverFilters, DiscoverPage, Movie, MovieId, MovieSummary},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// How many detail lookups are in flight at once during deck hydration
const DETAIL_FETCH_CONCURRENCY: usize = 8;

/// Trait for movie metadata providers
///
/// Implementations are expected to cache aggressively: discovery pages and
/// search results change slowly, and detail records are effectively
/// immutable.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieProvider: Send + Sync {
    /// Fetch one page of movies matching the given filter criteria
    async fn discover(&self, filters: &DiscoverFilters, page: u32) -> AppResult<DiscoverPage>;

    /// Search for movies by title, best match first
    async fn search(&self, title: &str) -> AppResult<Vec<MovieSummary>>;

    /// Fetch the full record for a single movie
    async fn movie_details(&self, movie_id: MovieId) -> AppResult<Movie>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Fetches details for many movies with bounded parallelism
///
/// Lookups run in groups of [`DETAIL_FETCH_CONCURRENCY`] so a long id list
/// does not open an unbounded number of upstream connections. A failed
/// lookup drops that movie from the result rather than failing the batch;
/// the output preserves input order.
pub async fn fetch_details_batch(
    provider: &Arc<dyn MovieProvider>,
    movie_ids: &[MovieId],
) -> Vec<Movie> {
    let mut movies = Vec::with_capacity(movie_ids.len());
    let mut failed = 0usize;

    for group in movie_ids.chunks(DETAIL_FETCH_CONCURRENCY) {
        let mut tasks = Vec::with_capacity(group.len());

        for &movie_id in group {
            let provider = Arc::clone(provider);
            tasks.push(tokio::spawn(
                async move { provider.movie_details(movie_id).await },
            ));
        }

        for (task, &movie_id) in tasks.into_iter().zip(group) {
            match task.await {
                Ok(Ok(movie)) => movies.push(movie),
                Ok(Err(e)) => {
                    tracing::warn!(movie_id = %movie_id, error = %e, "Movie detail fetch failed, dropping");
                    failed += 1;
                }
                Err(e) => {
                    tracing::error!(movie_id = %movie_id, error = %e, "Task join error");
                    failed += 1;
                }
            }
        }
    }

    if failed > 0 {
        tracing::warn!(
            success_count = movies.len(),
            failed_count = failed,
            "Partial detail fetch failure"
        );
    }

    movies
}
