use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sink::MetadataSink;

/// Normalized book metadata produced by a successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub subtitle: Option<String>,
    /// Never empty; a placeholder author is substituted when the source has none.
    pub authors: Vec<String>,
    pub author_sort: String,
    pub publisher: Option<String>,
    pub comments: Option<String>,
    pub isbn: Option<String>,
    pub series: Option<String>,
    pub tags: Vec<String>,
    pub rating: i32,
    pub pubdate: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub website: Option<String>,
    pub author_intro: Option<String>,
    pub provider_key: String,
    pub provider_value: String,
    pub cover_url: Option<String>,
    pub cover_data: Option<CoverData>,
}

/// Downloaded cover image. `format` is the extension taken from the cover URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverData {
    pub format: String,
    pub media_type: Option<String>,
    /// Raw bytes are not serialized.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Metadata {
    /// Push every field into a host-side record.
    pub fn apply_to(&self, sink: &mut dyn MetadataSink) {
        sink.set_title(&self.title);
        sink.set_authors(&self.authors, &self.author_sort);
        if let Some(subtitle) = &self.subtitle {
            sink.set_subtitle(subtitle);
        }
        if let Some(publisher) = &self.publisher {
            sink.set_publisher(publisher);
        }
        if let Some(comments) = &self.comments {
            sink.set_comments(comments);
        }
        if let Some(isbn) = &self.isbn {
            sink.set_isbn(isbn);
        }
        if let Some(series) = &self.series {
            sink.set_series(series);
        }
        sink.set_tags(&self.tags);
        sink.set_rating(self.rating);
        if let Some(pubdate) = self.pubdate {
            sink.set_pubdate(pubdate);
        }
        sink.set_timestamp(self.timestamp);
        sink.set_source(&self.source);
        if let Some(website) = &self.website {
            sink.set_website(website);
        }
        if let Some(intro) = &self.author_intro {
            sink.set_author_intro(intro);
        }
        sink.set_provider(&self.provider_key, &self.provider_value);
        if let Some(url) = &self.cover_url {
            sink.set_cover(url, self.cover_data.as_ref());
        }
    }
}
