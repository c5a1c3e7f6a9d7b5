//! PatternFly documentation MCP server.
//!
//! Exposes the documentation pipeline as MCP tools and a resource template.
//!
//! # Tools
//!
//! - `usePatternFlyDocs`: load local documentation (slug-prefixed paths or
//!   paths under the context root) and return them as one markdown document
//! - `fetchDocs`: same pipeline, intended for remote URLs
//! - `searchPatternFlyDocs`: fuzzy search over the indexed documentation
//!
//! # Resources
//!
//! `patternfly-docs://{name}{?version}` returns a single document by name.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use pf_docs_mcp::config::Options;
//! use pf_docs_mcp::mcp::DocsServer;
//!
//! async fn example() {
//!     let server = DocsServer::build(Arc::new(Options::default())).await;
//! }
//! ```

use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
    PaginatedRequestParam, ProtocolVersion, RawResource, RawResourceTemplate, ReadResourceRequestParam,
    ReadResourceResult, ResourceContents, ServerCapabilities,
};
use rmcp::service::RequestContext;
use rmcp::{Error as McpError, RoleServer, ServerHandler, model::ServerInfo, schemars, tool};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use url::form_urlencoded;

use crate::aggregate::aggregate;
use crate::catalog::DocCatalog;
use crate::config::Options;
use crate::error::DocsError;
use crate::loader::DocsLoader;

pub const RESOURCE_SCHEME: &str = "patternfly-docs://";
pub const RESOURCE_TEMPLATE: &str = "patternfly-docs://{name}{?version}";
const MARKDOWN: &str = "text/markdown";

impl From<DocsError> for McpError {
    fn from(err: DocsError) -> Self {
        match err {
            DocsError::InvalidParams(message) => McpError::invalid_params(message, None),
            DocsError::NotFound(name) => McpError::resource_not_found(
                format!("No documentation found for {name}"),
                Some(json!({ "name": name })),
            ),
            err @ DocsError::Load(_) => McpError::internal_error(err.to_string(), None),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DocsRequest {
    #[serde(rename = "urlList")]
    #[schemars(description = "Documentation paths or URLs to load. Local documentation uses the `documentation:` prefix, e.g. `documentation:components/button.md`.")]
    pub url_list: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    #[serde(rename = "searchQuery")]
    #[schemars(description = "Component or guideline name to look for, e.g. 'date picker'")]
    pub search_query: String,

    #[serde(default)]
    #[schemars(description = "Optional PatternFly version or dependency range, e.g. 'v6' or '^5.2.0'")]
    pub version: Option<String>,
}

fn decode_component(component: &str) -> String {
    // form decoding also turns `+` into a space, which suits document names.
    form_urlencoded::parse(format!("v={component}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

/// Split `patternfly-docs://{name}?version=...` into template variables.
pub fn parse_resource_uri(uri: &str) -> Option<Map<String, Value>> {
    let rest = uri.strip_prefix(RESOURCE_SCHEME)?;
    let (name, query) = rest.split_once('?').unwrap_or((rest, ""));

    let mut variables = Map::new();
    variables.insert("name".to_string(), Value::String(decode_component(name.trim_end_matches('/'))));
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        variables.insert(key.into_owned(), Value::String(value.into_owned()));
    }
    Some(variables)
}

pub fn resource_uri(name: &str, version: Option<&str>) -> String {
    let name: String = form_urlencoded::byte_serialize(name.as_bytes()).collect();
    match version {
        Some(version) => format!("{RESOURCE_SCHEME}{name}?version={version}"),
        None => format!("{RESOURCE_SCHEME}{name}"),
    }
}

fn string_variable<'a>(variables: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, DocsError> {
    match variables.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.trim())),
        Some(_) => Err(DocsError::InvalidParams(format!("{key} must be a string"))),
    }
}

/// MCP handler. Clones share the loader caches and the catalog.
#[derive(Clone)]
pub struct DocsServer {
    loader: DocsLoader,
    catalog: Arc<DocCatalog>,
}

#[tool(tool_box)]
impl DocsServer {
    /// Creates a server from an existing loader and catalog.
    ///
    /// # Arguments
    /// * `loader` - Loader whose caches every tool and resource read share
    /// * `catalog` - Index used by search and named resource lookups
    pub fn new(loader: DocsLoader, catalog: DocCatalog) -> Self {
        Self {
            loader,
            catalog: Arc::new(catalog),
        }
    }

    /// Index the docs root and set up a loader for `options`.
    pub async fn build(options: Arc<Options>) -> Self {
        let catalog = DocCatalog::scan(&options).await;
        Self::new(DocsLoader::new(options), catalog)
    }

    pub fn catalog(&self) -> &DocCatalog {
        &self.catalog
    }

    /// Look up one document by template variables (`name`, optional `version`).
    ///
    /// # Returns
    /// The document text, `InvalidParams` for a missing or non-string name,
    /// `NotFound` when nothing in the catalog matches, or `Load` when the
    /// matching file cannot be read.
    pub async fn read_named_doc(&self, variables: &Map<String, Value>) -> Result<String, DocsError> {
        let name = string_variable(variables, "name")?
            .ok_or_else(|| DocsError::InvalidParams("name must be a non-empty string".to_string()))?;
        let version = string_variable(variables, "version")?;

        let entry = self.catalog.lookup(name, version)?;
        tracing::info!("Resource {:?} resolved to {}", name, entry.identifier);
        let loaded = self.loader.load_file_fetch(&entry.identifier).await?;
        Ok(loaded.content)
    }

    #[tool(
        name = "usePatternFlyDocs",
        description = "Load PatternFly documentation by path. Returns every requested document joined into one markdown response; documents that fail to load are reported inline."
    )]
    pub async fn use_patternfly_docs(
        &self,
        #[tool(aggr)] DocsRequest { url_list }: DocsRequest,
    ) -> Result<CallToolResult, McpError> {
        let text = aggregate(&self.loader, "PatternFly Documentation", &url_list).await?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "fetchDocs",
        description = "Fetch documentation from a list of URLs or paths and return them joined into one markdown response."
    )]
    pub async fn fetch_docs(
        &self,
        #[tool(aggr)] DocsRequest { url_list }: DocsRequest,
    ) -> Result<CallToolResult, McpError> {
        let text = aggregate(&self.loader, "Fetched Documentation", &url_list).await?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "searchPatternFlyDocs",
        description = "Search the PatternFly documentation index by name. Tolerates typos and returns the paths to pass to usePatternFlyDocs."
    )]
    pub async fn search_patternfly_docs(
        &self,
        #[tool(aggr)] SearchRequest { search_query, version }: SearchRequest,
    ) -> Result<CallToolResult, McpError> {
        if search_query.trim().is_empty() {
            return Err(DocsError::InvalidParams("searchQuery must be a non-empty string".to_string()).into());
        }

        let hits = self.catalog.search(&search_query, version.as_deref());
        if hits.is_empty() {
            let mut text = format!("No documentation matches \"{search_query}\".");
            if let Some(suggestion) = self.catalog.suggest(&search_query) {
                text.push_str(&format!(" Did you mean \"{suggestion}\"?"));
            }
            return Ok(CallToolResult::success(vec![Content::text(text)]));
        }

        let mut text = format!("# Search results for \"{search_query}\"\n");
        for hit in &hits {
            text.push_str(&format!("\n- **{}** ({:?}", hit.matched.item, hit.matched.match_type));
            if hit.matched.distance > 0 {
                text.push_str(&format!(", distance {}", hit.matched.distance));
            }
            text.push(')');
            for entry in &hit.entries {
                let version = entry.version.as_deref().unwrap_or("any version");
                text.push_str(&format!("\n  - {}: `{}`", version, entry.identifier));
            }
        }
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool(tool_box)]
impl ServerHandler for DocsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: self.loader.options().name.clone(),
                version: self.loader.options().version.clone(),
            },
            instructions: Some(
                "This server provides PatternFly documentation. \
                Use 'searchPatternFlyDocs' to find documents by name, then 'usePatternFlyDocs' \
                with the returned paths to read them. 'fetchDocs' loads documentation from URLs. \
                Single documents are also available as resources under patternfly-docs://{name}. \
                Results are cached for better performance."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: PaginatedRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let resources = self
            .catalog
            .entries()
            .iter()
            .map(|entry| {
                let mut raw = RawResource::new(resource_uri(&entry.name, entry.version.as_deref()), entry.name.clone());
                raw.description = Some(entry.identifier.clone());
                raw.mime_type = Some(MARKDOWN.to_string());
                raw.no_annotation()
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: PaginatedRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: vec![
                RawResourceTemplate {
                    uri_template: RESOURCE_TEMPLATE.to_string(),
                    name: "PatternFly documentation".to_string(),
                    description: Some(
                        "A PatternFly documentation page by name, optionally for a version such as v6 or ^5.2.0"
                            .to_string(),
                    ),
                    mime_type: Some(MARKDOWN.to_string()),
                }
                .no_annotation(),
            ],
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let variables = parse_resource_uri(&uri)
            .ok_or_else(|| McpError::resource_not_found("resource_not_found", Some(json!({ "uri": uri }))))?;

        let text = self.read_named_doc(&variables).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri,
                mime_type: Some(MARKDOWN.to_string()),
                text,
            }],
        })
    }
}
