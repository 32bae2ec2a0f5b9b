//! Metadata lookup via pluggable providers.

pub mod chooser;
pub mod douban;
pub mod raw;

use crate::error::LookupError;
use crate::metadata::Metadata;
use crate::sink::MetadataSink;

pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Full lookup. `Ok(None)` means nothing matched; `Err` is a transport or
    /// decoding failure.
    fn fetch(&self, query: &MetadataQuery, interactive: bool) -> Result<Option<Metadata>, LookupError>;

    /// Whether `get_metadata` may fall back to interactive selection.
    fn manual_select(&self) -> bool {
        false
    }

    /// Fail-soft lookup: errors are logged and reported as "nothing found".
    fn get_metadata(&self, query: &MetadataQuery) -> Option<Metadata> {
        self.fetch_logged(query, self.manual_select())
    }

    /// Like [`get_metadata`](Self::get_metadata), but always lets the operator
    /// pick when the search is ambiguous.
    fn select_metadata(&self, query: &MetadataQuery) -> Option<Metadata> {
        self.fetch_logged(query, true)
    }

    /// Look up and populate `sink`. Returns whether anything was found.
    fn fetch_into(&self, query: &MetadataQuery, interactive: bool, sink: &mut dyn MetadataSink) -> bool {
        match self.fetch_logged(query, interactive) {
            Some(md) => {
                md.apply_to(sink);
                true
            }
            None => false,
        }
    }

    #[doc(hidden)]
    fn fetch_logged(&self, query: &MetadataQuery, interactive: bool) -> Option<Metadata> {
        match self.fetch(query, interactive) {
            Ok(md) => md,
            Err(e) => {
                tracing::error!(provider = self.name(), "metadata lookup failed: {}", error_chain(&e));
                None
            }
        }
    }
}

/// What the caller knows about a book. Tried in order: provider id, ISBN,
/// then title (and author) search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataQuery {
    pub identifier: Option<String>,
    pub isbn: Option<String>,
    pub title: String,
    pub author: Option<String>,
}

impl MetadataQuery {
    pub fn by_title(title: impl Into<String>, author: Option<String>) -> Self {
        Self {
            title: title.into(),
            author,
            ..Default::default()
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        non_blank(self.identifier.as_deref())
    }

    pub fn isbn(&self) -> Option<&str> {
        non_blank(self.isbn.as_deref())
    }

    pub fn author(&self) -> Option<&str> {
        non_blank(self.author.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// `err: cause: cause` rendering of an error and its sources.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        out.push_str(": ");
        out.push_str(&e.to_string());
        source = e.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl MetadataProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(&self, _query: &MetadataQuery, _interactive: bool) -> Result<Option<Metadata>, LookupError> {
            Err(LookupError::Status {
                url: "http://x".to_string(),
                status: 500,
            })
        }
    }

    #[test]
    fn query_ignores_blank_fields() {
        let q = MetadataQuery {
            identifier: Some("  ".to_string()),
            isbn: Some("".to_string()),
            title: "T".to_string(),
            author: Some(" A ".to_string()),
        };
        assert_eq!(q.identifier(), None);
        assert_eq!(q.isbn(), None);
        assert_eq!(q.author(), Some("A"));
    }

    #[test]
    fn entry_points_are_fail_soft() {
        let q = MetadataQuery::by_title("T", None);
        assert!(Failing.get_metadata(&q).is_none());
        assert!(Failing.select_metadata(&q).is_none());
        let mut map = crate::sink::FieldMap::new();
        assert!(!Failing.fetch_into(&q, false, &mut map));
        assert!(map.is_empty());
    }

    #[test]
    fn error_chain_includes_sources() {
        let inner = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = LookupError::Decode {
            url: "http://x".to_string(),
            source: inner,
        };
        let text = error_chain(&err);
        assert!(text.starts_with("Malformed response from http://x"));
        assert!(text.matches("EOF").count() >= 2);
    }
}
