//! Joins loaded documents into a single markdown response.

use crate::batch::{LoadedDocument, process_docs};
use crate::error::DocsError;
use crate::loader::DocsLoader;

pub const DOC_SEPARATOR: &str = "\n\n---\n\n";

/// Reject an identifier list that is empty or only blank strings.
pub fn validate_identifiers<S: AsRef<str>>(identifiers: &[S]) -> Result<(), DocsError> {
    if identifiers.iter().all(|identifier| identifier.as_ref().trim().is_empty()) {
        return Err(DocsError::InvalidParams(
            "urlList must contain at least one non-empty path or URL".to_string(),
        ));
    }
    Ok(())
}

fn section(doc: &LoadedDocument) -> String {
    match &doc.resolved_path {
        Some(resolved) => format!("## {}\nSource: {}\n\n{}", doc.path, resolved, doc.content),
        None => format!("## {}\n\n{}", doc.path, doc.content),
    }
}

/// `# {title}` followed by one section per document, in order.
pub fn join_documents(title: &str, documents: &[LoadedDocument]) -> String {
    let body = documents.iter().map(section).collect::<Vec<_>>().join(DOC_SEPARATOR);
    format!("# {title}\n\n{body}")
}

/// Validate, load and join. Only an invalid identifier list is an error;
/// per-document failures are inlined as text.
///
/// # Arguments
/// * `loader` - Loader used for every document
/// * `title` - Top-level heading of the response
/// * `identifiers` - Paths or URLs, deduplicated and capped before loading
pub async fn aggregate<S: AsRef<str>>(
    loader: &DocsLoader,
    title: &str,
    identifiers: &[S],
) -> Result<String, DocsError> {
    validate_identifiers(identifiers)?;
    let documents = process_docs(loader, identifiers).await;
    Ok(join_documents(title, &documents))
}
