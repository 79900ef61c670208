/// TMDB (The Movie Database) provider
///
/// Covers discovery (`/discover/movie`), title search (`/search/movie`) and
/// detail lookup (`/movie/{id}`) against the TMDB v3 REST API. All three
/// calls are cached in Redis: search results and discover pages shift slowly
/// enough for an hour, detail records are effectively immutable and cached
/// for a week.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        DiscoverFilters, DiscoverPage, Movie, MovieId, MovieSummary, TmdbMovieDetails, TmdbPage,
    },
    services::providers::MovieProvider,
};
use reqwest::Client as HttpClient;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DISCOVER_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }
}

/// Cache key suffix for one discover page: filters plus page number
fn discover_cache_key(filters: &DiscoverFilters, page: u32) -> String {
    let genres = filters
        .genres
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(".");
    let year = |y: Option<i32>| y.map_or_else(|| "*".to_string(), |y| y.to_string());

    format!(
        "g{}:y{}-{}:p{}",
        genres,
        year(filters.year_from),
        year(filters.year_to),
        page
    )
}

/// Query parameters for one discover page
fn discover_params(filters: &DiscoverFilters, page: u32) -> Vec<(String, String)> {
    let mut params = vec![
        ("page".to_string(), page.to_string()),
        ("sort_by".to_string(), "popularity.desc".to_string()),
        ("include_adult".to_string(), "false".to_string()),
    ];

    if !filters.genres.is_empty() {
        let genres = filters
            .genres
            .iter()
            .map(|g| g.to_string())
            .collect::<Vec<_>>()
            .join(",");
        params.push(("with_genres".to_string(), genres));
    }

    if let Some(from) = filters.year_from {
        params.push((
            "primary_release_date.gte".to_string(),
            format!("{}-01-01", from),
        ));
    }

    if let Some(to) = filters.year_to {
        params.push((
            "primary_release_date.lte".to_string(),
            format!("{}-12-31", to),
        ));
    }

    params
}

#[async_trait::async_trait]
impl MovieProvider for TmdbProvider {
    async fn discover(&self, filters: &DiscoverFilters, page: u32) -> AppResult<DiscoverPage> {
        cached!(
            self.cache,
            CacheKey::Discover(discover_cache_key(filters, page)),
            DISCOVER_CACHE_TTL,
            async move {
                let url = format!("{}/discover/movie", self.api_url);
                let mut params = discover_params(filters, page);
                params.push(("api_key".to_string(), self.api_key.clone()));

                let response = self.http_client.get(&url).query(&params).send().await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::ExternalApi(format!(
                        "TMDB API returned status {}: {}",
                        status, body
                    )));
                }

                let raw: TmdbPage = response.json().await?;
                let discover_page = DiscoverPage::from(raw);

                tracing::info!(
                    page = page,
                    results = discover_page.movies.len(),
                    total_pages = discover_page.total_pages,
                    provider = "tmdb",
                    "Discover page fetched"
                );

                Ok(discover_page)
            }
        )
    }

    async fn search(&self, title: &str) -> AppResult<Vec<MovieSummary>> {
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::MovieSearch(title.to_string()),
            SEARCH_CACHE_TTL,
            async move {
                let url = format!("{}/search/movie", self.api_url);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[
                        ("api_key", self.api_key.as_str()),
                        ("query", title),
                        ("include_adult", "false"),
                    ])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::ExternalApi(format!(
                        "TMDB API returned status {}: {}",
                        status, body
                    )));
                }

                let raw: TmdbPage = response.json().await?;
                let results: Vec<MovieSummary> =
                    raw.results.into_iter().map(MovieSummary::from).collect();

                tracing::info!(
                    query = %title,
                    results = results.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                Ok(results)
            }
        )
    }

    async fn movie_details(&self, movie_id: MovieId) -> AppResult<Movie> {
        cached!(
            self.cache,
            CacheKey::MovieDetails(movie_id),
            DETAILS_CACHE_TTL,
            async move {
                let url = format!("{}/movie/{}", self.api_url, movie_id);

                let response = self
                    .http_client
                    .get(&url)
                    .query(&[("api_key", self.api_key.as_str())])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::ExternalApi(format!(
                        "TMDB API returned status {}: {}",
                        status, body
                    )));
                }

                let details: TmdbMovieDetails = response.json().await?;

                tracing::debug!(
                    movie_id = %movie_id,
                    provider = "tmdb",
                    "Movie details fetched"
                );

                Ok(Movie::from(details))
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_cache_key_full_filters() {
        let filters = DiscoverFilters {
            genres: vec![28, 878],
            year_from: Some(1990),
            year_to: Some(1999),
        };
        assert_eq!(discover_cache_key(&filters, 2), "g28.878:y1990-1999:p2");
    }

    #[test]
    fn test_discover_cache_key_empty_filters() {
        let filters = DiscoverFilters::default();
        assert_eq!(discover_cache_key(&filters, 1), "g:y*-*:p1");
    }

    #[test]
    fn test_discover_params_full_filters() {
        let filters = DiscoverFilters {
            genres: vec![28, 878],
            year_from: Some(1990),
            year_to: Some(1999),
        };

        let params = discover_params(&filters, 3);
        assert!(params.contains(&("page".to_string(), "3".to_string())));
        assert!(params.contains(&("with_genres".to_string(), "28,878".to_string())));
        assert!(params.contains(&(
            "primary_release_date.gte".to_string(),
            "1990-01-01".to_string()
        )));
        assert!(params.contains(&(
            "primary_release_date.lte".to_string(),
            "1999-12-31".to_string()
        )));
    }

    #[test]
    fn test_discover_params_omit_unset_filters() {
        let params = discover_params(&DiscoverFilters::default(), 1);
        assert!(!params.iter().any(|(k, _)| k == "with_genres"));
        assert!(!params.iter().any(|(k, _)| k.starts_with("primary_release_date")));
    }
}
