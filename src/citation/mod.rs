//! Citation building for submitted article links.
//!
//! A citation has the form:
//!
//! ```text
//! <first author>. <title>. <source>; <year>.
//! ```
//!
//! with `Unknown` standing in for a missing author and `n.d.` for a missing
//! year. Failures are returned as a typed [`CitationError`]; only
//! [`citation_text`] turns them into the string stored in the table.
//!
//! # Submodules
//!
//! - [`extract`]: HTML metadata extraction
//! - [`fetch`]: page download with retry/backoff

pub mod extract;
pub mod fetch;

use extract::extract_metadata;
use fetch::PageFetcher;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const NO_DATE: &str = "n.d.";

/// Reasons a citation could not be built.
#[derive(Debug, Error)]
pub enum CitationError {
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(StatusCode),
}

impl CitationError {
    /// Whether trying the download again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CitationError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            CitationError::Status(s) => s.is_server_error() || *s == StatusCode::TOO_MANY_REQUESTS,
            _ => false,
        }
    }
}

/// A successfully extracted citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub author: String,
    pub title: String,
    /// Origin of the article URL, e.g. `https://www.wral.com`.
    pub source: String,
    /// Four digit year, or `n.d.`.
    pub year: String,
}

impl Citation {
    /// Build a citation from an already downloaded page.
    ///
    /// Missing fields are filled in rather than rejected; a page without a
    /// title yields an empty title.
    pub fn from_html(url: &Url, html: &str) -> Self {
        let meta = extract_metadata(html);
        let title = meta.title.clone().unwrap_or_default();
        let author = meta
            .authors
            .first()
            .cloned()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        let year = meta
            .publication_year(url.as_str())
            .map(|y| y.to_string())
            .unwrap_or_else(|| NO_DATE.to_string());

        Self {
            author,
            title,
            source: url.origin().ascii_serialization(),
            year,
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}. {}; {}.", self.author, self.title, self.source, self.year)
    }
}

/// Render a citation result as the text stored in the table.
pub fn citation_text(result: &Result<Citation, CitationError>) -> String {
    match result {
        Ok(citation) => citation.to_string(),
        Err(e) => format!("Could not extract citation: {e}"),
    }
}

/// Parse and check an article link.
pub fn parse_article_url(raw: &str) -> Result<Url, CitationError> {
    let url = Url::parse(raw.trim()).map_err(|source| CitationError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CitationError::UnsupportedScheme(other.to_string())),
    }
}

/// Downloads articles and turns them into citations.
#[derive(Debug)]
pub struct CitationBuilder<F> {
    fetcher: F,
}

impl<F: PageFetcher> CitationBuilder<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn build(&self, url: &str) -> Result<Citation, CitationError> {
        let parsed = parse_article_url(url)?;
        let html = self.fetcher.fetch(parsed.as_str()).await?;
        let citation = Citation::from_html(&parsed, &html);
        if citation.title.is_empty() {
            warn!("Article has no title; citing it with an empty one");
        }
        info!(author = %citation.author, year = %citation.year, "Built citation");
        Ok(citation)
    }
}
