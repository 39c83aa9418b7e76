//! Stylesheet sources and remote fetching.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use url::Url;

use super::CssError;

/// One entry of the ordered stylesheet list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StylesheetSource {
    Local(PathBuf),
    Remote(Url),
}

impl StylesheetSource {
    /// Parse a configured entry: absolute `http(s)` URLs are remote,
    /// anything else is a path relative to `root`.
    pub fn parse(entry: &str, root: &Path) -> Self {
        if let Ok(url) = Url::parse(entry)
            && matches!(url.scheme(), "http" | "https")
        {
            return Self::Remote(url);
        }
        Self::Local(crate::utils::path::resolve_path(Path::new(entry), root))
    }

    /// Parse every entry, preserving order and duplicates.
    pub fn parse_all(entries: &[String], root: &Path) -> Vec<Self> {
        entries.iter().map(|e| Self::parse(e, root)).collect()
    }

    /// Identifier used in source maps and error messages.
    pub fn id(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.to_string(),
        }
    }

    /// Directory relative `url()` references resolve against. Remote
    /// stylesheets have none.
    pub fn base_dir(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => path.parent(),
            Self::Remote(_) => None,
        }
    }
}

impl fmt::Display for StylesheetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

// ============================================================================
// Fetching
// ============================================================================

/// Retrieves the text of a remote stylesheet.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<String, CssError>;
}

/// Blocking HTTP fetcher.
///
/// The client is built on first use, on the thread doing the fetch, so a
/// fetcher can be created inside an async runtime.
#[derive(Default)]
pub struct HttpFetch {
    client: OnceLock<reqwest::blocking::Client>,
}

impl HttpFetch {
    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, reqwest::Error> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::TIMEOUT)
            .user_agent(concat!("brisk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl Fetch for HttpFetch {
    fn fetch(&self, url: &Url) -> Result<String, CssError> {
        let fail = |e: reqwest::Error| CssError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };
        self.client()
            .map_err(fail)?
            .get(url.as_str())
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(fail)
    }
}

// ============================================================================
// Remote cache
// ============================================================================

/// Fetched remote stylesheets, keyed by URL.
///
/// Lives as long as its `Concatenator`. Entries are never evicted; call
/// [`RemoteCache::clear`] to force refetching.
///
/// Each URL has its own slot: concurrent lookups of one URL wait for a
/// single fetch, lookups of different URLs don't block each other.
#[derive(Default)]
pub struct RemoteCache {
    entries: DashMap<Url, Arc<Mutex<Option<Arc<str>>>>>,
}

impl RemoteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached text for `url`, fetching it on first use.
    ///
    /// Failed fetches are not cached.
    pub fn get_or_fetch(&self, url: &Url, fetch: &dyn Fetch) -> Result<Arc<str>, CssError> {
        // Clone the slot out so the shard lock is released before fetching
        let slot = self.entries.entry(url.clone()).or_default().value().clone();
        let mut text = slot.lock();
        if let Some(hit) = text.as_ref() {
            crate::debug!("css"; "cache hit {}", url);
            return Ok(Arc::clone(hit));
        }
        let fetched: Arc<str> = fetch.fetch(url)?.into();
        *text = Some(Arc::clone(&fetched));
        Ok(fetched)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached stylesheets.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| slot.value().lock().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
