//! Article metadata extraction from raw HTML.
//!
//! Authors, title and publication date are looked up in the places news sites
//! commonly put them, most specific first:
//!
//! | Field  | Sources |
//! |--------|---------|
//! | author | `meta[name=author]`, `article:author`, JSON-LD `author`, `[rel=author]` |
//! | title  | `og:title`, JSON-LD `headline`, `<title>`, first `<h1>` |
//! | date   | `article:published_time`, date meta tags, JSON-LD `datePublished`, `time[datetime]`, URL path |

use chrono::{DateTime, Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

static AUTHOR_META_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"meta[name="author"], meta[name="Author"], meta[property="article:author"], meta[name="byl"], meta[name="sailthru.author"]"#,
    )
    .unwrap()
});

static AUTHOR_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[rel="author"], [itemprop="author"]"#).unwrap());

static TITLE_META_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:title"], meta[name="twitter:title"]"#).unwrap()
});

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());

static DATE_META_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"meta[property="article:published_time"], meta[name="article:published_time"], meta[name="pubdate"], meta[name="publishdate"], meta[name="publish-date"], meta[name="date"], meta[name="DC.date.issued"], meta[itemprop="datePublished"]"#,
    )
    .unwrap()
});

static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("time[datetime]").unwrap());

static JSON_LD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

static BYLINE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*by[:\s]+").unwrap());

static AUTHOR_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:,|&|\band\b)\s*").unwrap());

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

static URL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/((?:19|20)\d{2})[/-](?:0?[1-9]|1[0-2])[/-]").unwrap());

/// Metadata pulled out of an article page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ArticleMetadata {
    pub authors: Vec<String>,
    pub title: Option<String>,
    /// The raw publication date string as found on the page.
    pub published: Option<String>,
}

impl ArticleMetadata {
    /// Publication year, from the page date if parseable, else from the URL path.
    pub fn publication_year(&self, url: &str) -> Option<i32> {
        self.published
            .as_deref()
            .and_then(year_from_date)
            .or_else(|| year_from_url(url))
    }
}

/// Extract authors, title and publication date from an HTML document.
pub fn extract_metadata(html: &str) -> ArticleMetadata {
    let document = Html::parse_document(html);
    let json_ld = json_ld_objects(&document);

    ArticleMetadata {
        authors: authors(&document, &json_ld),
        title: title(&document, &json_ld),
        published: published(&document, &json_ld),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn meta_contents<'a>(document: &'a Html, selector: &'a Selector) -> impl Iterator<Item = String> + 'a {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

/// Every JSON-LD object on the page, with `@graph` containers flattened.
fn json_ld_objects(document: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    for script in document.select(&JSON_LD_SELECTOR) {
        let raw = script.text().collect::<String>();
        let Ok(value) = serde_json::from_str::<Value>(raw.trim()) else {
            continue;
        };
        flatten_json_ld(value, &mut objects);
    }
    objects
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten_json_ld(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

fn json_ld_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("name") {
                out.push(name.clone());
            }
        }
        Value::Array(items) => items.iter().for_each(|v| json_ld_names(v, out)),
        _ => {}
    }
}

/// Strip a leading "By" and split multi-author bylines.
fn split_byline(raw: &str) -> Vec<String> {
    let cleaned = BYLINE_PREFIX.replace(raw.trim(), "");
    AUTHOR_SEPARATOR
        .split(&cleaned)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty() && !s.starts_with("http"))
        .collect()
}

fn authors(document: &Html, json_ld: &[Value]) -> Vec<String> {
    let mut raw = Vec::new();
    raw.extend(meta_contents(document, &AUTHOR_META_SELECTOR));
    for object in json_ld {
        if let Some(author) = object.get("author") {
            json_ld_names(author, &mut raw);
        }
    }
    raw.extend(
        document
            .select(&AUTHOR_LINK_SELECTOR)
            .map(element_text)
            .filter(|s| !s.is_empty()),
    );

    let mut authors: Vec<String> = Vec::new();
    for name in raw.iter().flat_map(|r| split_byline(r)) {
        if !authors.iter().any(|a| a.eq_ignore_ascii_case(&name)) {
            authors.push(name);
        }
    }
    authors
}

fn title(document: &Html, json_ld: &[Value]) -> Option<String> {
    meta_contents(document, &TITLE_META_SELECTOR)
        .next()
        .or_else(|| {
            json_ld
                .iter()
                .filter_map(|o| o.get("headline").and_then(Value::as_str))
                .map(collapse_whitespace)
                .find(|s| !s.is_empty())
        })
        .or_else(|| {
            document
                .select(&TITLE_SELECTOR)
                .map(element_text)
                .find(|s| !s.is_empty())
        })
        .or_else(|| {
            document
                .select(&H1_SELECTOR)
                .map(element_text)
                .find(|s| !s.is_empty())
        })
}

fn published(document: &Html, json_ld: &[Value]) -> Option<String> {
    meta_contents(document, &DATE_META_SELECTOR)
        .next()
        .or_else(|| {
            json_ld
                .iter()
                .filter_map(|o| o.get("datePublished").and_then(Value::as_str))
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })
        .or_else(|| {
            document
                .select(&TIME_SELECTOR)
                .filter_map(|el| el.value().attr("datetime"))
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(str::to_string)
        })
}

/// Year of a date string in RFC 3339, `YYYY-MM-DD...` or free-text form.
pub fn year_from_date(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.year());
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date.year());
        }
    }
    YEAR.captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Year embedded in a dated URL path such as `/2024/09/28/slug`.
pub fn year_from_url(url: &str) -> Option<i32> {
    URL_DATE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
