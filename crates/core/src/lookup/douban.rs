//! Douban book API provider.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::DoubanSettings;
use crate::error::LookupError;
use crate::lookup::chooser::{CandidateChooser, NoChooser};
use crate::lookup::raw::{Envelope, RawBook, SearchPage};
use crate::lookup::{MetadataProvider, MetadataQuery};
use crate::metadata::{CoverData, Metadata};
use crate::normalize::{normalize, AuthorPrefixes, PROVIDER_KEY};

pub const DEFAULT_BASE_URL: &str = "https://api.douban.com";
pub const DEFAULT_MAX_COUNT: u32 = 2;

/// What to do when eager cover download fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverFailure {
    /// The whole fetch fails.
    #[default]
    Abort,
    /// Log it and return the metadata without cover bytes.
    Skip,
}

/// Request headers sent with every API and image request. Douban rejects
/// clients that don't look like a desktop browser.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserHeaders {
    pub accept: String,
    pub accept_language: String,
    pub user_agent: String,
}

impl Default for BrowserHeaders {
    fn default() -> Self {
        Self {
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
            accept_language: "zh-CN,zh;q=0.8,zh-TW;q=0.6".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/66.0.3359.139 Safari/537.36"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DoubanConfig {
    pub apikey: String,
    pub base_url: String,
    /// Download cover bytes along with the metadata.
    pub copy_image: bool,
    /// Allow operator selection in [`MetadataProvider::get_metadata`].
    pub manual_select: bool,
    /// `count` sent with title searches.
    pub max_count: u32,
    pub cover_failure: CoverFailure,
    pub headers: BrowserHeaders,
    pub author_prefixes: AuthorPrefixes,
}

impl DoubanConfig {
    pub fn new(apikey: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

impl Default for DoubanConfig {
    fn default() -> Self {
        Self {
            apikey: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            copy_image: true,
            manual_select: false,
            max_count: DEFAULT_MAX_COUNT,
            cover_failure: CoverFailure::default(),
            headers: BrowserHeaders::default(),
            author_prefixes: AuthorPrefixes::default(),
        }
    }
}

impl From<&DoubanSettings> for DoubanConfig {
    fn from(s: &DoubanSettings) -> Self {
        Self {
            apikey: s.apikey.clone(),
            base_url: s.base_url.clone(),
            copy_image: s.copy_image,
            manual_select: s.manual_select,
            max_count: s.max_count,
            cover_failure: s.cover_failure,
            ..Default::default()
        }
    }
}

pub struct DoubanProvider {
    config: DoubanConfig,
    http: Client,
    chooser: Box<dyn CandidateChooser>,
}

impl DoubanProvider {
    pub fn new(config: DoubanConfig) -> Result<Self, LookupError> {
        let http = Client::builder().build()?;
        Ok(Self {
            config,
            http,
            chooser: Box::new(NoChooser),
        })
    }

    /// Use `chooser` when a title search is ambiguous and selection is allowed.
    pub fn with_chooser(mut self, chooser: impl CandidateChooser + 'static) -> Self {
        self.chooser = Box::new(chooser);
        self
    }

    pub fn config(&self) -> &DoubanConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let h = &self.config.headers;
        self.http
            .get(url)
            .header(ACCEPT, h.accept.as_str())
            .header(ACCEPT_LANGUAGE, h.accept_language.as_str())
            .header(USER_AGENT, h.user_agent.as_str())
    }

    /// Send and decode an API request. Envelope errors are logged and
    /// reported as `Ok(None)`.
    fn send_json<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> Result<Option<T>, LookupError> {
        tracing::debug!(url, "douban request");
        let response = request.send()?;
        let status = response.status();
        let body = response.bytes()?;
        let envelope = match Envelope::<T>::decode(url, &body) {
            Ok(env) => env,
            Err(_) if !status.is_success() => {
                return Err(LookupError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(e),
        };
        match envelope {
            Envelope::Payload(v) => Ok(Some(v)),
            Envelope::Failed { code, msg } => {
                let err = LookupError::Remote { code, msg };
                tracing::error!("******** {} **********", err);
                Ok(None)
            }
        }
    }

    pub fn lookup_by_remote_id(&self, id: &str) -> Result<Option<RawBook>, LookupError> {
        let url = self.endpoint(&format!("/v2/book/id/{}", id));
        self.send_json(&url, self.get(&url))
    }

    pub fn lookup_by_isbn(&self, isbn: &str) -> Result<Option<RawBook>, LookupError> {
        let url = self.endpoint(&format!("/v2/book/isbn/{}", isbn));
        let request = self.get(&url).query(&[("apikey", self.config.apikey.as_str())]);
        self.send_json(&url, request)
    }

    /// Raw search results for `title` (plus `author`, when given).
    pub fn search_by_title(&self, title: &str, author: Option<&str>) -> Result<Option<Vec<RawBook>>, LookupError> {
        let url = self.endpoint("/v2/book/search");
        let q = match author {
            Some(a) => format!("{} {}", title, a),
            None => title.to_string(),
        };
        let count = self.config.max_count.to_string();
        let request = self.get(&url).query(&[
            ("apikey", self.config.apikey.as_str()),
            ("q", q.as_str()),
            ("count", count.as_str()),
        ]);
        Ok(self.send_json::<SearchPage>(&url, request)?.map(|page| page.books))
    }

    /// Search by title and pick the candidate that matches exactly. When no
    /// candidate matches and `interactive` is set, the chooser decides.
    pub fn resolve_title(
        &self,
        title: &str,
        author: Option<&str>,
        interactive: bool,
    ) -> Result<Option<RawBook>, LookupError> {
        if title.trim().is_empty() {
            tracing::debug!("empty title, skipping search");
            return Ok(None);
        }
        let mut books = match self.search_by_title(title, author)? {
            Some(books) if !books.is_empty() => books,
            _ => return Ok(None),
        };
        for b in &mut books {
            if b.author.is_empty() {
                b.author = b.translator.clone();
            }
        }

        if let Some(found) = pick_exact(&books, title, author) {
            return Ok(Some(found.clone()));
        }
        if !interactive {
            tracing::debug!(title, ?author, candidates = books.len(), "no exact title match");
            return Ok(None);
        }
        let picked = self.chooser.choose(title, author, &books);
        Ok(picked.and_then(|i| books.into_iter().nth(i)))
    }

    fn download_cover(&self, url: &str) -> Result<CoverData, LookupError> {
        let fail = |reason: String| LookupError::Cover {
            url: url.to_string(),
            reason,
        };
        let response = self
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| fail(e.to_string()))?;
        let data = response.bytes().map_err(|e| fail(e.to_string()))?.to_vec();
        let format = cover_extension(url);
        let media_type = image::ImageFormat::from_extension(&format).map(|f| f.to_mime_type().to_string());
        Ok(CoverData {
            format,
            media_type,
            data,
        })
    }

    fn to_metadata(&self, book: &RawBook) -> Result<Metadata, LookupError> {
        let mut md = normalize(book, &self.config.author_prefixes);
        if self.config.copy_image {
            if let Some(url) = md.cover_url.clone() {
                match self.download_cover(&url) {
                    Ok(cover) => md.cover_data = Some(cover),
                    Err(e) if self.config.cover_failure == CoverFailure::Skip => {
                        tracing::warn!("{}", e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        tracing::debug!(title = %md.title, id = %md.provider_value, "douban metadata: {:?}", md);
        Ok(md)
    }
}

/// First candidate whose title matches and, when an author is given, whose
/// first credited author equals it.
pub fn pick_exact<'a>(books: &'a [RawBook], title: &str, author: Option<&str>) -> Option<&'a RawBook> {
    books
        .iter()
        .filter(|b| b.matches_title(title))
        .find(|b| author.map_or(true, |a| b.first_author() == Some(a)))
}

/// Lower-cased extension of the last path segment of `url`.
fn cover_extension(url: &str) -> String {
    let path = reqwest::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    path.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

impl MetadataProvider for DoubanProvider {
    fn name(&self) -> &str {
        PROVIDER_KEY
    }

    fn manual_select(&self) -> bool {
        self.config.manual_select
    }

    fn fetch(&self, query: &MetadataQuery, interactive: bool) -> Result<Option<Metadata>, LookupError> {
        let mut book = if let Some(id) = query.identifier() {
            self.lookup_by_remote_id(id)?
        } else if let Some(isbn) = query.isbn() {
            self.lookup_by_isbn(isbn)?
        } else {
            None
        };
        if book.is_none() {
            book = self.resolve_title(&query.title, query.author(), interactive)?;
        }
        match book {
            Some(b) => self.to_metadata(&b).map(Some),
            None => Ok(None),
        }
    }
}
