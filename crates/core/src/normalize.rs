//! Mapping of raw Douban records onto [`Metadata`].

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;

use crate::lookup::raw::RawBook;
use crate::metadata::Metadata;

/// Provider key stored on every record for later re-fetch by id.
pub const PROVIDER_KEY: &str = "douban";
/// Human-readable source attribution.
pub const SOURCE: &str = "豆瓣";
/// Author used when the source credits nobody ("anonymous").
pub const PLACEHOLDER_AUTHOR: &str = "佚名";
pub const MAX_TAGS: usize = 8;

/// Leading nationality/role markers such as `[美]`, `(英)`, `【日】`, `（法）`.
pub const DEFAULT_AUTHOR_PREFIXES: &[&str] = &[
    r"^\([^)]*\)\s*",
    r"^\[[^\]]*\]\s*",
    r"^【[^】]*】\s*",
    r"^（[^）]*）\s*",
];

/// Compiled set of prefixes stripped from author names.
#[derive(Debug, Clone)]
pub struct AuthorPrefixes {
    patterns: Vec<Regex>,
}

impl AuthorPrefixes {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Remove leading bracketed segments: at most one per bracket style, tried
    /// in pattern order, so `(a)[b]X` loses both but `[a](b)X` keeps `(b)`.
    pub fn strip(&self, name: &str) -> String {
        let mut out = name.trim().to_string();
        for re in &self.patterns {
            out = re.replace(&out, "").into_owned();
        }
        out.trim().to_string()
    }
}

impl Default for AuthorPrefixes {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHOR_PREFIXES).expect("default author prefixes are valid regexes")
    }
}

/// Strip prefixes from every author; never returns an empty list.
pub fn normalize_authors(authors: &[String], prefixes: &AuthorPrefixes) -> Vec<String> {
    let names: Vec<String> = authors
        .iter()
        .map(|a| prefixes.strip(a))
        .filter(|a| !a.is_empty())
        .collect();
    if names.is_empty() {
        vec![PLACEHOLDER_AUTHOR.to_string()]
    } else {
        names
    }
}

/// Truncate (not round) a rating average such as `"8.9"` to an integer.
/// Text that is not a number counts as unrated.
pub fn truncate_rating(average: &str) -> i32 {
    match average.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i32,
        _ => 0,
    }
}

const PUBDATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y-%m", "%Y年", "%Y"];

/// Parse Douban's free-form `pubdate`. The first matching format wins; missing
/// month and day default to 1; the result is midnight UTC.
pub fn parse_pubdate(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let date = PUBDATE_FORMATS.iter().find_map(|fmt| parse_with(s, fmt))?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

fn parse_with(s: &str, fmt: &str) -> Option<NaiveDate> {
    match fmt {
        "%Y-%m" => NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok(),
        "%Y年" => s.strip_suffix('年').and_then(parse_year),
        "%Y" => parse_year(s),
        _ => NaiveDate::parse_from_str(s, fmt).ok(),
    }
}

fn parse_year(s: &str) -> Option<NaiveDate> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Build a [`Metadata`] from a raw record. The cover is recorded by URL only;
/// downloading it is the client's job.
pub fn normalize(book: &RawBook, prefixes: &AuthorPrefixes) -> Metadata {
    let authors = normalize_authors(&book.author, prefixes);
    let author_sort = authors[0].clone();
    let website = non_empty(&book.id).map(|id| format!("https://book.douban.com/subject/{}/", id));

    Metadata {
        title: book.title.clone(),
        subtitle: non_empty(&book.subtitle),
        authors,
        author_sort,
        publisher: non_empty(&book.publisher),
        comments: non_empty(&book.summary),
        isbn: book.isbn13.as_deref().and_then(non_empty),
        series: book.series.clone(),
        tags: book
            .tags
            .iter()
            .take(MAX_TAGS)
            .map(|t| t.name.clone())
            .collect(),
        rating: truncate_rating(&book.rating.average),
        pubdate: parse_pubdate(&book.pubdate),
        timestamp: Utc::now(),
        source: SOURCE.to_string(),
        website,
        author_intro: non_empty(&book.author_intro),
        provider_key: PROVIDER_KEY.to_string(),
        provider_value: book.id.clone(),
        cover_url: non_empty(&book.images.large),
        cover_data: None,
    }
}
