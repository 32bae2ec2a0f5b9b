//! Host-side destination for normalized metadata.
//!
//! A cataloging application implements [`MetadataSink`] for its own record
//! type and receives fields through [`Metadata::apply_to`](crate::metadata::Metadata::apply_to).
//! Only title and authors are mandatory; every other setter defaults to a no-op.

use chrono::{DateTime, Utc};

use crate::metadata::CoverData;

pub trait MetadataSink {
    fn set_title(&mut self, title: &str);
    fn set_authors(&mut self, authors: &[String], author_sort: &str);

    fn set_subtitle(&mut self, _subtitle: &str) {}
    fn set_publisher(&mut self, _publisher: &str) {}
    fn set_comments(&mut self, _comments: &str) {}
    fn set_isbn(&mut self, _isbn: &str) {}
    fn set_series(&mut self, _series: &str) {}
    fn set_tags(&mut self, _tags: &[String]) {}
    fn set_rating(&mut self, _rating: i32) {}
    fn set_pubdate(&mut self, _pubdate: DateTime<Utc>) {}
    fn set_timestamp(&mut self, _timestamp: DateTime<Utc>) {}
    fn set_source(&mut self, _source: &str) {}
    fn set_website(&mut self, _website: &str) {}
    fn set_author_intro(&mut self, _intro: &str) {}
    fn set_provider(&mut self, _key: &str, _value: &str) {}
    fn set_cover(&mut self, _url: &str, _data: Option<&CoverData>) {}
}

/// Flat, insertion-ordered `field -> text` view of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    fields: Vec<(&'static str, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn put(&mut self, field: &'static str, value: String) {
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }
}

impl MetadataSink for FieldMap {
    fn set_title(&mut self, title: &str) {
        self.put("title", title.to_string());
    }

    fn set_authors(&mut self, authors: &[String], author_sort: &str) {
        self.put("authors", authors.join(" & "));
        self.put("author_sort", author_sort.to_string());
    }

    fn set_subtitle(&mut self, subtitle: &str) {
        self.put("subtitle", subtitle.to_string());
    }

    fn set_publisher(&mut self, publisher: &str) {
        self.put("publisher", publisher.to_string());
    }

    fn set_comments(&mut self, comments: &str) {
        self.put("comments", comments.to_string());
    }

    fn set_isbn(&mut self, isbn: &str) {
        self.put("isbn", isbn.to_string());
    }

    fn set_series(&mut self, series: &str) {
        self.put("series", series.to_string());
    }

    fn set_tags(&mut self, tags: &[String]) {
        if !tags.is_empty() {
            self.put("tags", tags.join(", "));
        }
    }

    fn set_rating(&mut self, rating: i32) {
        self.put("rating", rating.to_string());
    }

    fn set_pubdate(&mut self, pubdate: DateTime<Utc>) {
        self.put("pubdate", pubdate.format("%Y-%m-%d").to_string());
    }

    fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.put("timestamp", timestamp.to_rfc3339());
    }

    fn set_source(&mut self, source: &str) {
        self.put("source", source.to_string());
    }

    fn set_website(&mut self, website: &str) {
        self.put("website", website.to_string());
    }

    fn set_author_intro(&mut self, intro: &str) {
        self.put("author_intro", intro.to_string());
    }

    fn set_provider(&mut self, key: &str, value: &str) {
        self.put("provider", format!("{}:{}", key, value));
    }

    fn set_cover(&mut self, url: &str, data: Option<&CoverData>) {
        self.put("cover_url", url.to_string());
        if let Some(cover) = data {
            self.put("cover_data", format!("{} bytes ({})", cover.data.len(), cover.format));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use chrono::TimeZone;

    fn sample() -> Metadata {
        Metadata {
            title: "The Book".to_string(),
            subtitle: None,
            authors: vec!["Alice".to_string(), "Bob".to_string()],
            author_sort: "Alice".to_string(),
            publisher: Some("Press".to_string()),
            comments: None,
            isbn: Some("9787020002207".to_string()),
            series: None,
            tags: vec!["novel".to_string(), "classic".to_string()],
            rating: 8,
            pubdate: Some(Utc.with_ymd_and_hms(2014, 3, 1, 0, 0, 0).unwrap()),
            timestamp: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            source: "豆瓣".to_string(),
            website: None,
            author_intro: None,
            provider_key: "douban".to_string(),
            provider_value: "42".to_string(),
            cover_url: Some("https://img/large.jpg".to_string()),
            cover_data: Some(CoverData {
                format: "jpg".to_string(),
                media_type: Some("image/jpeg".to_string()),
                data: vec![1, 2, 3],
            }),
        }
    }

    #[test]
    fn field_map_receives_present_fields_only() {
        let mut map = FieldMap::new();
        sample().apply_to(&mut map);
        assert_eq!(map.get("title"), Some("The Book"));
        assert_eq!(map.get("authors"), Some("Alice & Bob"));
        assert_eq!(map.get("author_sort"), Some("Alice"));
        assert_eq!(map.get("tags"), Some("novel, classic"));
        assert_eq!(map.get("pubdate"), Some("2014-03-01"));
        assert_eq!(map.get("provider"), Some("douban:42"));
        assert_eq!(map.get("cover_data"), Some("3 bytes (jpg)"));
        assert_eq!(map.get("comments"), None);
        assert_eq!(map.get("subtitle"), None);
    }

    #[test]
    fn minimal_sink_only_needs_title_and_authors() {
        #[derive(Default)]
        struct Minimal {
            title: String,
            authors: Vec<String>,
        }
        impl MetadataSink for Minimal {
            fn set_title(&mut self, title: &str) {
                self.title = title.to_string();
            }
            fn set_authors(&mut self, authors: &[String], _author_sort: &str) {
                self.authors = authors.to_vec();
            }
        }

        let mut sink = Minimal::default();
        sample().apply_to(&mut sink);
        assert_eq!(sink.title, "The Book");
        assert_eq!(sink.authors.len(), 2);
    }
}
