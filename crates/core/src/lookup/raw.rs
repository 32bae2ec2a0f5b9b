//! Wire model of the Douban book API.
//!
//! Every field is optional on the wire and Douban is loose with types (ids and
//! rating averages arrive as strings or numbers, `author` as a list or a bare
//! string, and any field may be `null`), so the deserializers here accept all
//! of those shapes and fall back to empty values.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// A book object as returned by `/v2/book/id`, `/v2/book/isbn` and inside
/// the `books` array of `/v2/book/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBook {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subtitle: String,
    #[serde(deserialize_with = "one_or_many")]
    pub author: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub translator: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub publisher: String,
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    pub isbn13: Option<String>,
    pub isbn10: Option<String>,
    #[serde(alias = "serials", deserialize_with = "series_name")]
    pub series: Option<String>,
    #[serde(deserialize_with = "skip_nulls")]
    pub tags: Vec<RawTag>,
    #[serde(deserialize_with = "null_as_default")]
    pub rating: RawRating,
    #[serde(deserialize_with = "null_as_default")]
    pub pubdate: String,
    #[serde(deserialize_with = "null_as_default")]
    pub images: RawImages,
    #[serde(deserialize_with = "null_as_default")]
    pub author_intro: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alt: String,
    #[serde(deserialize_with = "string_or_number")]
    pub pages: String,
    #[serde(deserialize_with = "null_as_default")]
    pub price: String,
}

impl RawBook {
    /// First credited author, if any.
    pub fn first_author(&self) -> Option<&str> {
        self.author.first().map(String::as_str)
    }

    /// `title`, or `title:subtitle` when a subtitle is present.
    pub fn display_title(&self) -> String {
        if self.subtitle.is_empty() {
            self.title.clone()
        } else {
            format!("{}:{}", self.title, self.subtitle)
        }
    }

    /// Exact title match against either the bare title or `title:subtitle`.
    pub fn matches_title(&self, title: &str) -> bool {
        self.title == title || format!("{}:{}", self.title, self.subtitle) == title
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTag {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRating {
    /// Kept as text; Douban sends `"8.9"`, `8.9` or `""`.
    #[serde(deserialize_with = "string_or_number")]
    pub average: String,
    #[serde(rename = "numRaters", deserialize_with = "null_as_default")]
    pub num_raters: u64,
    pub max: Option<u32>,
    pub min: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawImages {
    #[serde(deserialize_with = "null_as_default")]
    pub small: String,
    #[serde(deserialize_with = "null_as_default")]
    pub medium: String,
    #[serde(deserialize_with = "null_as_default")]
    pub large: String,
}

/// Payload of `/v2/book/search`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchPage {
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub start: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(deserialize_with = "skip_nulls")]
    pub books: Vec<RawBook>,
}

/// A decoded API response: either the payload or the `code`/`msg` pair the
/// API uses to signal application errors (also on HTTP 200).
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Payload(T),
    Failed { code: i64, msg: String },
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn decode(url: &str, body: &[u8]) -> Result<Self, LookupError> {
        let decode_err = |source| LookupError::Decode {
            url: url.to_string(),
            source,
        };
        let value: serde_json::Value = serde_json::from_slice(body).map_err(decode_err)?;
        if let Some(code) = value.get("code").and_then(serde_json::Value::as_i64) {
            if code != 0 {
                let msg = value
                    .get("msg")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return Ok(Envelope::Failed { code, msg });
            }
        }
        serde_json::from_value(value).map(Envelope::Payload).map_err(decode_err)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A list that may itself be `null` or contain `null` entries.
fn skip_nulls<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Text(s)) => s,
        Some(Scalar::Int(n)) => n.to_string(),
        Some(Scalar::Float(f)) => f.to_string(),
        None => String::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<Option<String>>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if s.is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v.into_iter().flatten().collect(),
        None => Vec::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesField {
    Name(String),
    Info {
        #[serde(default)]
        title: Option<String>,
    },
}

fn series_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let name = match Option::<SeriesField>::deserialize(deserializer)? {
        Some(SeriesField::Name(s)) => Some(s),
        Some(SeriesField::Info { title }) => title,
        None => None,
    };
    Ok(name.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_loose_book_shapes() {
        let body = br#"{
            "id": 1084336,
            "title": "The Little Prince",
            "subtitle": null,
            "author": "Antoine de Saint-Exupery",
            "translator": ["Ma Zhenpin", null],
            "rating": {"max": 10, "numRaters": 12, "average": 9.0, "min": 0},
            "series": {"id": "7", "title": "Classics"},
            "tags": [{"name": "fairy tale", "count": 3}]
        }"#;
        let book = match Envelope::<RawBook>::decode("u", body).unwrap() {
            Envelope::Payload(b) => b,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(book.id, "1084336");
        assert_eq!(book.subtitle, "");
        assert_eq!(book.author, vec!["Antoine de Saint-Exupery".to_string()]);
        assert_eq!(book.translator, vec!["Ma Zhenpin".to_string()]);
        assert_eq!(book.rating.average, "9");
        assert_eq!(book.rating.num_raters, 12);
        assert_eq!(book.series.as_deref(), Some("Classics"));
        assert_eq!(book.tags[0].name, "fairy tale");
        assert_eq!(book.images.large, "");
    }

    #[test]
    fn legacy_serials_field_is_accepted() {
        let body = br#"{"id": "1", "serials": "Foundation"}"#;
        let Envelope::Payload(book) = Envelope::<RawBook>::decode("u", body).unwrap() else {
            panic!("expected payload");
        };
        assert_eq!(book.series.as_deref(), Some("Foundation"));
    }

    #[test]
    fn nonzero_code_is_a_failed_envelope() {
        let body = br#"{"code": 1001, "msg": "invalid key", "request": "GET /v2/book/isbn/1"}"#;
        let env = Envelope::<RawBook>::decode("u", body).unwrap();
        assert_eq!(
            env,
            Envelope::Failed {
                code: 1001,
                msg: "invalid key".to_string()
            }
        );
    }

    #[test]
    fn zero_code_is_a_payload() {
        let body = br#"{"code": 0, "title": "A"}"#;
        let env = Envelope::<RawBook>::decode("u", body).unwrap();
        assert!(matches!(env, Envelope::Payload(b) if b.title == "A"));
    }

    #[test]
    fn search_page_missing_books_is_empty() {
        let env = Envelope::<SearchPage>::decode("u", br#"{"count": 0, "total": 0}"#).unwrap();
        assert!(matches!(env, Envelope::Payload(p) if p.books.is_empty()));
    }

    #[test]
    fn null_counters_default_to_zero() {
        let body = br#"{"id": "2", "rating": {"average": "8.9", "numRaters": null}}"#;
        let Envelope::Payload(book) = Envelope::<RawBook>::decode("u", body).unwrap() else {
            panic!("expected payload");
        };
        assert_eq!(book.rating.num_raters, 0);
        assert_eq!(book.rating.average, "8.9");

        let body = br#"{"count": null, "start": null, "total": null, "books": [null, {"title": "A"}]}"#;
        let Envelope::Payload(page) = Envelope::<SearchPage>::decode("u", body).unwrap() else {
            panic!("expected payload");
        };
        assert_eq!((page.count, page.start, page.total), (0, 0, 0));
        assert_eq!(page.books.len(), 1);
        assert_eq!(page.books[0].title, "A");
    }

    #[test]
    fn null_tag_entries_are_skipped() {
        let body = br#"{"id": "3", "tags": [null, {"name": "x", "count": null}, {"name": null}]}"#;
        let Envelope::Payload(book) = Envelope::<RawBook>::decode("u", body).unwrap() else {
            panic!("expected payload");
        };
        let names: Vec<&str> = book.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["x", ""]);

        let body = br#"{"id": "4", "tags": null}"#;
        let Envelope::Payload(book) = Envelope::<RawBook>::decode("u", body).unwrap() else {
            panic!("expected payload");
        };
        assert!(book.tags.is_empty());
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = Envelope::<RawBook>::decode("http://x/v2", b"<html>").unwrap_err();
        assert!(matches!(err, LookupError::Decode { ref url, .. } if url == "http://x/v2"));
    }

    #[test]
    fn title_matching_uses_subtitle_join() {
        let book = RawBook {
            title: "A".to_string(),
            subtitle: "S".to_string(),
            ..Default::default()
        };
        assert!(book.matches_title("A"));
        assert!(book.matches_title("A:S"));
        assert!(!book.matches_title("A: S"));
        assert_eq!(book.display_title(), "A:S");
    }
}
