//! Loads many documents with a sliding concurrency window.
//!
//! Individual failures never abort the batch; each one becomes a
//! [`LoadedDocument`] with `is_success == false` and the error as content.

use futures::stream::{FuturesUnordered, StreamExt};
use itertools::Itertools;
use serde::Serialize;
use std::future::Future;

use crate::loader::DocsLoader;
use crate::matcher::normalize;
use crate::resolver::ResolvedLocation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedDocument {
    pub content: String,
    /// The identifier as the caller supplied it, trimmed.
    pub path: String,
    pub resolved_path: Option<ResolvedLocation>,
    pub is_success: bool,
}

/// Trim, drop blanks, dedupe on the normalized form keeping the first
/// spelling, and cap at `max`.
pub fn dedupe_identifiers<S: AsRef<str>>(identifiers: &[S], max: usize) -> Vec<String> {
    identifiers
        .iter()
        .map(|identifier| identifier.as_ref().trim())
        .filter(|identifier| !identifier.is_empty())
        .unique_by(|identifier| normalize(identifier))
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Run `load` over `items` with at most `limit` futures in flight, returning
/// outputs in input order.
///
/// A new item is admitted only after an in-flight one settles, so the
/// window never exceeds `limit` even when several settle in the same poll.
pub async fn run_bounded<I, F, Fut>(items: I, limit: usize, mut load: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    let limit = limit.max(1);
    let mut pending = items.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();
    let mut results = Vec::new();

    loop {
        while in_flight.len() < limit {
            let Some((index, item)) = pending.next() else {
                break;
            };
            results.push(None);
            let future = load(item);
            in_flight.push(async move { (index, future.await) });
        }

        match in_flight.next().await {
            Some((index, output)) => results[index] = Some(output),
            None => break,
        }
    }

    results.into_iter().flatten().collect()
}

/// Dedupe, cap and load `identifiers`, returning one document per surviving
/// identifier in first-occurrence order.
pub async fn process_docs<S: AsRef<str>>(loader: &DocsLoader, identifiers: &[S]) -> Vec<LoadedDocument> {
    let options = loader.options();
    let unique = dedupe_identifiers(identifiers, options.max_docs_to_load);
    let total = unique.len();
    if identifiers.len() > total {
        tracing::debug!("Loading {} of {} requested documents", total, identifiers.len());
    }

    let documents = run_bounded(unique, options.max_concurrent_loads, |path| async move {
        match loader.load_file_fetch(&path).await {
            Ok(loaded) => LoadedDocument {
                content: loaded.content,
                path,
                resolved_path: Some(loaded.resolved_path),
                is_success: true,
            },
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", path, e);
                LoadedDocument {
                    content: format!("❌ Failed to load {path}: {e}"),
                    path,
                    resolved_path: None,
                    is_success: false,
                }
            }
        }
    })
    .await;

    let failed = documents.iter().filter(|doc| !doc.is_success).count();
    tracing::info!("Loaded {} documents ({} failed)", total, failed);
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::Barrier;

    #[test]
    fn test_dedupe_identifiers() {
        let ids = [" Docs/Button.md ", "docs/button.md", "", "  ", "docs/alert.md", "DOCS/ALERT.MD"];
        assert_eq!(dedupe_identifiers(&ids, 10), vec!["Docs/Button.md", "docs/alert.md"]);
        assert_eq!(dedupe_identifiers(&ids, 1), vec!["Docs/Button.md"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_never_exceeds_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outputs = run_bounded(0..12, 5, |i| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Every in-flight load wakes on the same tick.
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                i * 2
            }
        })
        .await;

        assert_eq!(outputs, (0..12).map(|i| i * 2).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 5);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_window_refills_after_simultaneous_settlement() {
        // Each wave can only pass the barrier once exactly `limit` loads are in flight.
        let barrier = Arc::new(Barrier::new(4));
        let outputs = tokio::time::timeout(
            Duration::from_secs(5),
            run_bounded(0..12, 4, |i| {
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    i
                }
            }),
        )
        .await
        .expect("window stalled");

        assert_eq!(outputs, (0..12).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let outputs = run_bounded(vec![30u64, 10, 20, 0], 2, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;
        assert_eq!(outputs, vec![30, 10, 20, 0]);
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("good.md"), "# Good").unwrap();
        let loader = DocsLoader::new(Arc::new(Options::with_context_path(dir.path())));

        let docs = process_docs(&loader, &["good.md", "missing.md"]).await;

        assert_eq!(docs.len(), 2);
        assert!(docs[0].is_success);
        assert_eq!(docs[0].content, "# Good");
        assert!(!docs[1].is_success);
        assert!(docs[1].content.contains("missing.md"));
        assert!(docs[1].resolved_path.is_none());
    }

    #[tokio::test]
    async fn test_caps_at_max_docs() {
        let dir = tempdir().unwrap();
        for i in 0..4 {
            std::fs::write(dir.path().join(format!("doc{i}.md")), format!("doc {i}")).unwrap();
        }
        let mut options = Options::with_context_path(dir.path());
        options.max_docs_to_load = 3;
        let loader = DocsLoader::new(Arc::new(options));

        let docs = process_docs(&loader, &["doc0.md", "doc1.md", "DOC0.md", "doc2.md", "doc3.md"]).await;
        let paths: Vec<_> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["doc0.md", "doc1.md", "doc2.md"]);
    }
}
