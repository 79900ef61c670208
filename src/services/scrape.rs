/// URL-to-title-list scraping
///
/// A session deck can be sourced from a webpage (a published watchlist, a
/// "best of" article). Extraction is modelled as an ordered chain of
/// parsers: each knows whether it can handle a URL and how to pull title
/// strings out of the page. The last parser in the chain is a catch-all
/// that treats the page's visible text as a free-text title list, so exact
/// per-site fidelity is best-effort by design.
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client as HttpClient;

use crate::{
    error::{AppError, AppResult},
    services::deck::parse_title_list,
};

/// Upper bound on titles taken from a single scraped page
pub const MAX_SCRAPED_TITLES: usize = 50;

/// One strategy for extracting movie titles from a webpage
#[async_trait::async_trait]
pub trait TitleListParser: Send + Sync {
    /// Whether this parser knows how to read the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Fetch the page and extract title strings, page order preserved
    async fn parse(&self, url: &str) -> AppResult<Vec<String>>;

    /// Parser name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Ordered parser chain with a catch-all fallback
pub struct ScraperChain {
    parsers: Vec<Box<dyn TitleListParser>>,
}

impl Default for ScraperChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperChain {
    /// Builds the default chain: site-specific parsers first, generic last
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(LetterboxdParser::new()),
                Box::new(GenericListParser::new()),
            ],
        }
    }

    /// Scrapes a URL into a bounded list of candidate titles
    pub async fn scrape(&self, url: &str) -> AppResult<Vec<String>> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::InvalidInput(format!(
                "Not a valid http(s) URL: {}",
                url
            )));
        }

        let parser = self
            .parsers
            .iter()
            .find(|p| p.can_handle(url))
            .ok_or_else(|| AppError::Internal("Scraper chain has no catch-all".to_string()))?;

        tracing::info!(url = %url, parser = parser.name(), "Scraping URL for titles");

        let mut titles = parser.parse(url).await?;
        titles.truncate(MAX_SCRAPED_TITLES);

        tracing::info!(
            url = %url,
            parser = parser.name(),
            titles = titles.len(),
            "Scrape completed"
        );

        Ok(titles)
    }
}

async fn fetch_page(http_client: &HttpClient, url: &str) -> AppResult<String> {
    let response = http_client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(AppError::ExternalApi(format!(
            "Scrape target returned status {}",
            status
        )));
    }

    Ok(response.text().await?)
}

// ============================================================================
// Letterboxd
// ============================================================================

static FILM_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-film-slug="([a-z0-9-]+)""#).unwrap());

/// Parser for letterboxd.com list pages
pub struct LetterboxdParser {
    http_client: HttpClient,
}

impl LetterboxdParser {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
        }
    }
}

impl Default for LetterboxdParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts film slugs from a Letterboxd page and humanizes them
///
/// "the-dark-knight" becomes "The Dark Knight". Slugs lose punctuation, so
/// downstream title resolution must tolerate approximate forms.
fn letterboxd_titles(html: &str) -> Vec<String> {
    let mut titles = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for caps in FILM_SLUG.captures_iter(html) {
        let slug = &caps[1];
        if seen.insert(slug.to_string()) {
            titles.push(slug_to_title(slug));
        }
    }

    titles
}

fn slug_to_title(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait::async_trait]
impl TitleListParser for LetterboxdParser {
    fn can_handle(&self, url: &str) -> bool {
        url.contains("letterboxd.com/")
    }

    async fn parse(&self, url: &str) -> AppResult<Vec<String>> {
        let html = fetch_page(&self.http_client, url).await?;
        Ok(letterboxd_titles(&html))
    }

    fn name(&self) -> &'static str {
        "letterboxd"
    }
}

// ============================================================================
// Generic fallback
// ============================================================================

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Catch-all parser: reduce the page to visible text and read it as a
/// free-text title list
pub struct GenericListParser {
    http_client: HttpClient,
}

impl GenericListParser {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
        }
    }
}

impl Default for GenericListParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips markup down to newline-separated visible text
fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, "\n");
    let without_tags = HTML_TAG.replace_all(&without_scripts, "\n");

    without_tags
        .replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&nbsp;", " ")
}

#[async_trait::async_trait]
impl TitleListParser for GenericListParser {
    fn can_handle(&self, _url: &str) -> bool {
        true
    }

    async fn parse(&self, url: &str) -> AppResult<Vec<String>> {
        let html = fetch_page(&self.http_client, url).await?;
        Ok(parse_title_list(&html_to_text(&html)))
    }

    fn name(&self) -> &'static str {
        "generic"
    }
}
