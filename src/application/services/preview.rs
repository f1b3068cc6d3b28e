//! Page preview and favicon caching over the fetch collaborator.
//!
//! The actual network fetch is an external concern behind [`PreviewFetcher`];
//! this service only adds the bounded, recency-evicting caches so repeated
//! selections of the same bookmark never refetch.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::application::error::ApplicationResult;

/// Title/description pair extracted from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagePreview {
    pub title: String,
    pub description: String,
}

/// External collaborator that fetches page metadata.
pub trait PreviewFetcher: Send + Sync {
    fn fetch_preview(&self, url: &str) -> ApplicationResult<PagePreview>;

    /// Raw favicon image bytes.
    fn fetch_favicon(&self, url: &str) -> ApplicationResult<Vec<u8>>;
}

/// Caching front for a [`PreviewFetcher`].
pub struct PreviewService {
    fetcher: Arc<dyn PreviewFetcher>,
    previews: Cache<String, PagePreview>,
    favicons: Cache<String, Arc<Vec<u8>>>,
}

impl PreviewService {
    pub fn new(fetcher: Arc<dyn PreviewFetcher>, capacity: u64, ttl: Duration) -> Self {
        Self {
            fetcher,
            previews: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            favicons: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Preview for a URL, served from cache when possible. Failures are not
    /// cached; the next call retries.
    pub fn preview(&self, url: &str) -> ApplicationResult<PagePreview> {
        if let Some(hit) = self.previews.get(url) {
            return Ok(hit);
        }
        debug!(%url, "preview cache miss");
        let fetched = self.fetcher.fetch_preview(url)?;
        self.previews.insert(url.to_string(), fetched.clone());
        Ok(fetched)
    }

    /// Cached preview without touching the collaborator.
    pub fn cached_preview(&self, url: &str) -> Option<PagePreview> {
        self.previews.get(url)
    }

    pub fn favicon(&self, url: &str) -> ApplicationResult<Arc<Vec<u8>>> {
        if let Some(hit) = self.favicons.get(url) {
            return Ok(hit);
        }
        debug!(%url, "favicon cache miss");
        let fetched = Arc::new(self.fetcher.fetch_favicon(url)?);
        self.favicons.insert(url.to_string(), fetched.clone());
        Ok(fetched)
    }
}
