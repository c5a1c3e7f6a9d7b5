//! Turns caller-supplied identifiers into locations the loader may touch.
//!
//! Local paths are jailed: the normalized result must sit strictly inside
//! the docs root (for slug identifiers) or the context root (for everything
//! else). The check is lexical, on absolute paths with `.` and `..` folded.

use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::config::Options;
use crate::error::ResolveError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ResolvedLocation {
    Path(PathBuf),
    Url(String),
}

impl fmt::Display for ResolvedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedLocation::Path(path) => write!(f, "{}", path.display()),
            ResolvedLocation::Url(url) => f.write_str(url),
        }
    }
}

/// `scheme://...` where scheme is `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
pub fn looks_like_url(identifier: &str) -> bool {
    let Some((scheme, _)) = identifier.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Fold `.` and `..` without touching the filesystem. `..` at the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn jail(candidate: &Path, base: &Path, original: &str) -> Result<PathBuf, ResolveError> {
    let base = normalize_path(base);
    let resolved = normalize_path(candidate);

    // Component-wise, so `/srv/project-evil` is not inside `/srv/project`.
    if resolved != base && resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        tracing::warn!("Denied access to {:?} (resolved to {:?}, base {:?})", original, resolved, base);
        Err(ResolveError::AccessDenied {
            path: original.to_string(),
            base: base.display().to_string(),
        })
    }
}

/// Resolve `identifier` against `options`, failing closed on anything that escapes its root.
pub fn resolve_local_path(identifier: &str, options: &Options) -> Result<ResolvedLocation, ResolveError> {
    let identifier = identifier.trim();

    if let Some(relative) = identifier.strip_prefix(options.docs_path_slug.as_str()) {
        let candidate = options.docs_path.join(relative.trim_start_matches(['/', '\\']));
        return jail(&candidate, &options.docs_path, identifier).map(ResolvedLocation::Path);
    }

    if looks_like_url(identifier) {
        // Parsed only to validate; the caller's spelling is kept.
        return Url::parse(identifier)
            .map(|_| ResolvedLocation::Url(identifier.to_string()))
            .map_err(|e| ResolveError::InvalidUrl {
                url: identifier.to_string(),
                reason: e.to_string(),
            });
    }

    let candidate = options.context_path.join(identifier);
    jail(&candidate, &options.context_path, identifier).map(ResolvedLocation::Path)
}
