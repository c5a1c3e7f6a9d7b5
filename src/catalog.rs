//! Index of the markdown files under the documentation root.
//!
//! Built once at start-up. Backs the search tool and the named-document
//! resource, both of which go through the fuzzy matcher.

use itertools::Itertools;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::Options;
use crate::error::DocsError;
use crate::matcher::{FuzzyMatch, FuzzyOptions, find_closest, fuzzy_search, normalize};
use crate::version::{dep_major_version_normalize, match_package_version};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocEntry {
    /// File stem, or the parent directory for `README.md`/`index.md`.
    pub name: String,
    pub version: Option<String>,
    /// Slug-prefixed identifier accepted by the loader.
    pub identifier: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub matched: FuzzyMatch,
    pub entries: Vec<DocEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct DocCatalog {
    entries: Vec<DocEntry>,
    versions: Vec<String>,
}

/// Push subdirectories of `dir` onto `pending` and its markdown files onto `files`.
async fn read_markdown_dir(dir: &Path, pending: &mut Vec<PathBuf>, files: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // Symlinks are not followed.
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            pending.push(path);
        } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }
    Ok(())
}

/// Walk `pending` depth-first. Directories that cannot be read are logged and skipped.
async fn walk_markdown(mut pending: Vec<PathBuf>, mut files: Vec<PathBuf>) -> Vec<PathBuf> {
    while let Some(dir) = pending.pop() {
        if let Err(e) = read_markdown_dir(&dir, &mut pending, &mut files).await {
            tracing::warn!("Skipping unreadable directory {:?}: {}", dir, e);
        }
    }
    files.sort();
    files
}

async fn collect_markdown(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut pending = Vec::new();
    let mut files = Vec::new();
    read_markdown_dir(root, &mut pending, &mut files).await?;
    Ok(walk_markdown(pending, files).await)
}

fn entry_name(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.eq_ignore_ascii_case("readme") || stem.eq_ignore_ascii_case("index") {
        if let Some(parent) = relative.parent().and_then(Path::file_name) {
            return parent.to_string_lossy().into_owned();
        }
    }
    stem
}

fn entry_version(relative: &Path, versions: &[String]) -> Option<String> {
    let first = relative.components().next()?.as_os_str().to_string_lossy().into_owned();
    // A bare file at the root has no version directory.
    if relative.components().count() < 2 {
        return None;
    }
    let major = dep_major_version_normalize(&first);
    versions
        .iter()
        .find(|version| dep_major_version_normalize(version) == major)
        .cloned()
}

impl DocCatalog {
    /// `versions` lists the served versions, oldest first; the last one is preferred.
    pub fn new(entries: Vec<DocEntry>, versions: Vec<String>) -> Self {
        Self { entries, versions }
    }

    /// Index every `*.md` under `options.docs_path`. A missing root yields an empty catalog.
    pub async fn scan(options: &Options) -> Self {
        let root = &options.docs_path;
        let files = match collect_markdown(root).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Could not index documentation under {:?}: {}", root, e);
                return Self::new(Vec::new(), options.available_search_versions.clone());
            }
        };

        let entries: Vec<DocEntry> = files
            .iter()
            .filter_map(|file| file.strip_prefix(root).ok())
            .map(|relative| DocEntry {
                name: entry_name(relative),
                version: entry_version(relative, &options.available_search_versions),
                identifier: format!(
                    "{}{}",
                    options.docs_path_slug,
                    relative.components().map(|c| c.as_os_str().to_string_lossy()).join("/")
                ),
            })
            .collect();

        tracing::info!("Indexed {} documents under {:?}", entries.len(), root);
        Self::new(entries, options.available_search_versions.clone())
    }

    pub fn entries(&self) -> &[DocEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map a raw version range onto a served version.
    pub fn resolve_version(&self, raw: Option<&str>) -> Option<String> {
        raw.and_then(|raw| match_package_version(raw, &self.versions))
    }

    fn pool(&self, version: Option<&str>) -> Vec<&DocEntry> {
        match version {
            Some(version) => self
                .entries
                .iter()
                .filter(|entry| entry.version.as_deref().is_none_or(|v| v == version))
                .collect(),
            None => self.entries.iter().collect(),
        }
    }

    fn names(pool: &[&DocEntry]) -> Vec<String> {
        pool.iter().map(|entry| entry.name.clone()).unique().collect()
    }

    fn find_in<'a>(&self, pool: &[&'a DocEntry], name: &str, preferred: Option<&str>) -> Option<&'a DocEntry> {
        let wanted = normalize(name);
        let pick = |candidates: Vec<&'a DocEntry>| {
            candidates
                .iter()
                .find(|entry| preferred.is_some() && entry.version.as_deref() == preferred)
                .or_else(|| candidates.first())
                .copied()
        };

        let exact: Vec<&DocEntry> = pool.iter().copied().filter(|entry| normalize(&entry.name) == wanted).collect();
        if !exact.is_empty() {
            return pick(exact);
        }

        let options = FuzzyOptions { fuzzy: true, ..Default::default() };
        let best = fuzzy_search(name, &Self::names(pool), &options).into_iter().next()?;
        pick(pool.iter().copied().filter(|entry| entry.name == best.item).collect())
    }

    /// Find the document called `name`, preferring `version` (or the latest
    /// version) and falling back to other versions before giving up.
    pub fn lookup(&self, name: &str, version: Option<&str>) -> Result<&DocEntry, DocsError> {
        if name.trim().is_empty() {
            return Err(DocsError::InvalidParams("name must be a non-empty string".to_string()));
        }

        let requested = self.resolve_version(version);
        if version.is_some() && requested.is_none() {
            tracing::debug!("Version {:?} is not served, searching all versions", version);
        }
        let preferred = requested.or_else(|| self.versions.last().cloned());

        self.find_in(&self.pool(preferred.as_deref()), name, preferred.as_deref())
            .or_else(|| self.find_in(&self.pool(None), name, preferred.as_deref()))
            .ok_or_else(|| DocsError::NotFound(name.to_string()))
    }

    /// Fuzzy search over document names, optionally limited to one version.
    pub fn search(&self, query: &str, version: Option<&str>) -> Vec<SearchHit> {
        let pool = self.pool(self.resolve_version(version).as_deref());
        let options = FuzzyOptions { fuzzy: true, ..Default::default() };

        fuzzy_search(query, &Self::names(&pool), &options)
            .into_iter()
            .map(|matched| SearchHit {
                entries: pool
                    .iter()
                    .filter(|entry| entry.name == matched.item)
                    .map(|entry| (*entry).clone())
                    .collect(),
                matched,
            })
            .collect()
    }

    /// Closest document name, for "did you mean" hints.
    pub fn suggest(&self, query: &str) -> Option<String> {
        let names: Vec<String> = self.entries.iter().map(|entry| entry.name.clone()).unique().collect();
        find_closest(query, &names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchType;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    async fn sample_catalog() -> (tempfile::TempDir, DocCatalog) {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("documentation");
        write(&docs, "v5/components/button.md", "v5 button");
        write(&docs, "v6/components/button.md", "v6 button");
        write(&docs, "v6/components/date-picker.md", "date picker");
        write(&docs, "guidelines/README.md", "guidelines");
        write(&docs, "notes.txt", "ignored");

        let options = Options::with_context_path(dir.path());
        let catalog = DocCatalog::scan(&options).await;
        (dir, catalog)
    }

    #[tokio::test]
    async fn test_scan() {
        let (_dir, catalog) = sample_catalog().await;
        assert_eq!(catalog.entries().len(), 4);

        let guidelines = catalog.entries().iter().find(|e| e.name == "guidelines").unwrap();
        assert_eq!(guidelines.version, None);
        assert_eq!(guidelines.identifier, "documentation:guidelines/README.md");

        let v5 = catalog.entries().iter().find(|e| e.identifier.contains("v5")).unwrap();
        assert_eq!(v5.name, "button");
        assert_eq!(v5.version.as_deref(), Some("v5"));
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let dir = tempdir().unwrap();
        let catalog = DocCatalog::scan(&Options::with_context_path(dir.path())).await;
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_directory_is_skipped() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("documentation");
        write(&docs, "v6/components/button.md", "button");
        write(&docs, "guidelines/README.md", "guidelines");

        let files = walk_markdown(vec![docs.join("v6"), docs.join("vanished"), docs.join("guidelines")], Vec::new()).await;
        assert_eq!(
            files,
            vec![docs.join("guidelines/README.md"), docs.join("v6/components/button.md")]
        );
    }

    #[tokio::test]
    async fn test_lookup_prefers_latest_version() {
        let (_dir, catalog) = sample_catalog().await;
        let entry = catalog.lookup("Button", None).unwrap();
        assert_eq!(entry.version.as_deref(), Some("v6"));
    }

    #[tokio::test]
    async fn test_lookup_with_version_range() {
        let (_dir, catalog) = sample_catalog().await;
        let entry = catalog.lookup("button", Some("^5.2.0")).unwrap();
        assert_eq!(entry.identifier, "documentation:v5/components/button.md");
    }

    #[tokio::test]
    async fn test_lookup_falls_back_across_versions() {
        let (_dir, catalog) = sample_catalog().await;
        let entry = catalog.lookup("date picker", Some("5")).unwrap();
        assert_eq!(entry.version.as_deref(), Some("v6"));
    }

    #[tokio::test]
    async fn test_lookup_fuzzy_and_missing() {
        let (_dir, catalog) = sample_catalog().await;
        assert_eq!(catalog.lookup("buton", None).unwrap().name, "button");
        assert!(matches!(catalog.lookup("spaceship", None), Err(DocsError::NotFound(_))));
        assert!(matches!(catalog.lookup("  ", None), Err(DocsError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_search() {
        let (_dir, catalog) = sample_catalog().await;
        let hits = catalog.search("butt", None);
        assert_eq!(hits[0].matched.item, "button");
        assert_eq!(hits[0].matched.match_type, MatchType::Prefix);
        assert_eq!(hits[0].entries.len(), 2);

        let hits = catalog.search("button", Some("v5"));
        assert_eq!(hits[0].entries.len(), 1);
        assert_eq!(catalog.suggest("gidelines").as_deref(), Some("guidelines"));
    }
}
