//! Server configuration.
//!
//! [`Options`] is built once at start-up, then shared behind an `Arc` by every
//! component. Nothing reads configuration from global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default documentation slug prefix, e.g. `documentation:components/button.md`.
pub const DEFAULT_DOCS_PATH_SLUG: &str = "documentation:";

/// Cache settings for one memoized operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoOptions {
    /// Maximum resident entries; the oldest inserted entry is evicted first.
    pub cache_limit: usize,
    /// Sliding expiry measured from the last access. `None` never expires.
    pub expire: Option<Duration>,
    /// Keep failed results in the cache.
    pub cache_errors: bool,
}

impl Default for MemoOptions {
    fn default() -> Self {
        Self {
            cache_limit: 100,
            expire: Some(Duration::from_secs(60)),
            cache_errors: false,
        }
    }
}

/// Selects where the resource loader gets its bytes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Read local files and fetch remote URLs.
    Production,
    /// Route every file read and URL fetch to a single fixture endpoint.
    Test { fixture_url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub name: String,
    pub version: String,
    pub docs_path_slug: String,
    /// Root for slug-prefixed identifiers.
    pub docs_path: PathBuf,
    /// Root for plain relative and absolute paths.
    pub context_path: PathBuf,
    pub fetch_timeout_ms: u64,
    pub max_docs_to_load: usize,
    pub max_concurrent_loads: usize,
    pub fetch_url_cache: MemoOptions,
    pub read_file_cache: MemoOptions,
    pub available_search_versions: Vec<String>,
    pub mode: Mode,
}

impl Default for Options {
    fn default() -> Self {
        let context_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            docs_path_slug: DEFAULT_DOCS_PATH_SLUG.to_string(),
            docs_path: context_path.join("documentation"),
            context_path,
            fetch_timeout_ms: 15_000,
            max_docs_to_load: 15,
            max_concurrent_loads: 5,
            fetch_url_cache: MemoOptions {
                cache_limit: 100,
                expire: Some(Duration::from_secs(10 * 60)),
                cache_errors: false,
            },
            read_file_cache: MemoOptions {
                cache_limit: 50,
                expire: Some(Duration::from_secs(2 * 60)),
                cache_errors: false,
            },
            available_search_versions: vec!["v4".to_string(), "v5".to_string(), "v6".to_string()],
            mode: Mode::Production,
        }
    }
}

impl Options {
    /// Options rooted at `context_path`, with the docs root under it.
    pub fn with_context_path(context_path: impl AsRef<Path>) -> Self {
        let context_path = absolutize(context_path.as_ref());
        Self {
            docs_path: context_path.join("documentation"),
            context_path,
            ..Self::default()
        }
    }

    /// Replaces the root for `documentation:` identifiers.
    ///
    /// # Arguments
    /// * `docs_path` - New docs root; relative paths are taken from the current directory
    pub fn docs_path(mut self, docs_path: impl AsRef<Path>) -> Self {
        self.docs_path = absolutize(docs_path.as_ref());
        self
    }

    /// Selects production loading or a fixture endpoint.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(e) => {
            tracing::warn!("Could not read current directory ({}), keeping {:?} as is", e, path);
            path.to_path_buf()
        }
    }
}
