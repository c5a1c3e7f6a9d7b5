use thiserror::Error;

/// An identifier could not be turned into a safe location.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Access denied: {path} is outside of {base}")]
    AccessDenied { path: String, base: String },

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A single document failed to load. `Clone` so coalesced callers can share it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("HTTP {status} while fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Timed out after {timeout_ms}ms fetching {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Request error for {url}: {message}")]
    Request { url: String, message: String },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl LoadError {
    pub(crate) fn request(url: &str, err: reqwest::Error) -> Self {
        LoadError::Request { url: url.to_string(), message: err.to_string() }
    }
}

/// Errors surfaced to the protocol caller.
#[derive(Debug, Error)]
pub enum DocsError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("No documentation found for {0}")]
    NotFound(String),

    #[error("No documentation found: {0}")]
    Load(#[from] LoadError),
}
