//! Loads one document: resolve the identifier, then read or fetch it through
//! a per-operation [`Memo`].
//!
//! Where the bytes come from is a [`DocSource`]. Production reads the local
//! filesystem and fetches remote URLs; test mode sends both kinds of request
//! to a single fixture endpoint.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::{Mode, Options};
use crate::error::LoadError;
use crate::memo::Memo;
use crate::resolver::{ResolvedLocation, resolve_local_path};

const ACCEPT_TEXT: &str = "text/markdown, text/plain;q=0.9, */*;q=0.1";

#[async_trait]
pub trait DocSource: Send + Sync {
    async fn fetch_url(&self, url: &str) -> Result<String, LoadError>;
    async fn read_file(&self, path: &Path) -> Result<String, LoadError>;
}

async fn fetch_text(client: &Client, url: &str, timeout: Duration) -> Result<String, LoadError> {
    let request = async {
        let response = client
            .get(url)
            .header(ACCEPT, ACCEPT_TEXT)
            .send()
            .await
            .map_err(|e| LoadError::request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(|e| LoadError::request(url, e))
    };

    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| LoadError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })?
}

/// Local filesystem plus HTTP.
pub struct LiveSource {
    client: Client,
    timeout: Duration,
}

impl LiveSource {
    /// Creates a source whose HTTP fetches give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl DocSource for LiveSource {
    async fn fetch_url(&self, url: &str) -> Result<String, LoadError> {
        tracing::info!("Fetching {}", url);
        fetch_text(&self.client, url, self.timeout).await
    }

    async fn read_file(&self, path: &Path) -> Result<String, LoadError> {
        tracing::info!("Reading {:?}", path);
        tokio::fs::read_to_string(path).await.map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Serves every read and fetch from `GET {fixture_url}?path=<target>`.
pub struct FixtureSource {
    client: Client,
    fixture_url: String,
    timeout: Duration,
}

impl FixtureSource {
    /// Creates a source that asks `fixture_url` for every document.
    ///
    /// # Arguments
    /// * `fixture_url` - Endpoint queried as `GET {fixture_url}?path=<target>`
    /// * `timeout` - Per-request timeout
    pub fn new(fixture_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            fixture_url: fixture_url.into(),
            timeout,
        }
    }

    fn endpoint_for(&self, target: &str) -> Result<String, LoadError> {
        let mut endpoint = Url::parse(&self.fixture_url).map_err(|e| LoadError::Request {
            url: self.fixture_url.clone(),
            message: e.to_string(),
        })?;
        endpoint.query_pairs_mut().append_pair("path", target);
        Ok(endpoint.to_string())
    }
}

#[async_trait]
impl DocSource for FixtureSource {
    async fn fetch_url(&self, url: &str) -> Result<String, LoadError> {
        let endpoint = self.endpoint_for(url)?;
        tracing::debug!("Fixture fetch {} via {}", url, endpoint);
        fetch_text(&self.client, &endpoint, self.timeout).await
    }

    async fn read_file(&self, path: &Path) -> Result<String, LoadError> {
        let endpoint = self.endpoint_for(&path.to_string_lossy())?;
        tracing::debug!("Fixture read {:?} via {}", path, endpoint);
        fetch_text(&self.client, &endpoint, self.timeout).await
    }
}

/// The source selected by `options.mode`.
pub fn source_for(options: &Options) -> Arc<dyn DocSource> {
    match &options.mode {
        Mode::Production => Arc::new(LiveSource::new(options.fetch_timeout())),
        Mode::Test { fixture_url } => {
            tracing::info!("Test mode: serving documents from fixture endpoint {}", fixture_url);
            Arc::new(FixtureSource::new(fixture_url.clone(), options.fetch_timeout()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedContent {
    pub content: String,
    pub resolved_path: ResolvedLocation,
}

/// Resolves and loads single documents. Clones share caches.
#[derive(Clone)]
pub struct DocsLoader {
    options: Arc<Options>,
    source: Arc<dyn DocSource>,
    fetch_url: Memo<String, LoadError>,
    read_file: Memo<String, LoadError>,
}

impl DocsLoader {
    /// Create a loader whose [`DocSource`] follows `options.mode`.
    ///
    /// # Arguments
    /// * `options` - Shared configuration; cache sizes and expiry come from
    ///   `fetch_url_cache` and `read_file_cache`
    pub fn new(options: Arc<Options>) -> Self {
        let source = source_for(&options);
        Self::with_source(options, source)
    }

    /// Create a loader that reads and fetches through `source` regardless of mode.
    pub fn with_source(options: Arc<Options>, source: Arc<dyn DocSource>) -> Self {
        Self {
            fetch_url: Memo::new("fetch_url", options.fetch_url_cache),
            read_file: Memo::new("read_file", options.read_file_cache),
            options,
            source,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Resolve `identifier` and return its text along with where it came from.
    ///
    /// # Arguments
    /// * `identifier` - A `documentation:` path, a URL, or a path under the context root
    ///
    /// # Returns
    /// The document text and its resolved location, or a [`LoadError`] when
    /// resolution, the read or the fetch fails.
    pub async fn load_file_fetch(&self, identifier: &str) -> Result<LoadedContent, LoadError> {
        let resolved_path = resolve_local_path(identifier, &self.options)?;

        let content = match &resolved_path {
            ResolvedLocation::Url(url) => {
                let source = Arc::clone(&self.source);
                let target = url.clone();
                self.fetch_url
                    .call(url.as_str(), || async move { source.fetch_url(&target).await })
                    .await?
            }
            ResolvedLocation::Path(path) => {
                let source = Arc::clone(&self.source);
                let target: PathBuf = path.clone();
                // Raw OS bytes so non-UTF-8 paths still get distinct keys.
                self.read_file
                    .call(path.as_os_str().as_encoded_bytes(), || async move {
                        source.read_file(&target).await
                    })
                    .await?
            }
        };

        Ok(LoadedContent { content, resolved_path })
    }

    /// Empty both the URL and the file cache.
    pub async fn clear_caches(&self) {
        self.fetch_url.clear().await;
        self.read_file.clear().await;
    }
}
