use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use pf_docs_mcp::config::{Mode, Options};
use pf_docs_mcp::server;

#[derive(Parser, Debug)]
#[command(version, about = "PatternFly Documentation MCP Server")]
struct Cli {
    /// Type of server to run
    #[arg(short, long, value_enum, default_value_t = ServerType::Stdio)]
    server_type: ServerType,

    /// Address for the SSE server
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    address: String,

    /// Root for relative paths (defaults to the current directory)
    #[arg(long)]
    context_path: Option<PathBuf>,

    /// Root for `documentation:` paths (defaults to <context-path>/documentation)
    #[arg(long)]
    docs_path: Option<PathBuf>,

    /// Timeout for remote fetches, in milliseconds
    #[arg(long, default_value_t = 15_000)]
    fetch_timeout_ms: u64,

    /// Maximum number of documents loaded per request
    #[arg(long, default_value_t = 15)]
    max_docs: usize,

    /// Serve every read and fetch from this fixture endpoint instead of disk and network
    #[arg(long)]
    fixture_url: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ServerType {
    /// Start an SSE server
    Sse,
    /// Start a stdio server
    Stdio,
}

impl Cli {
    fn options(&self) -> Options {
        let mut options = match &self.context_path {
            Some(path) => Options::with_context_path(path),
            None => Options::default(),
        };
        if let Some(docs_path) = &self.docs_path {
            options = options.docs_path(docs_path);
        }
        if let Some(fixture_url) = &self.fixture_url {
            options = options.mode(Mode::Test { fixture_url: fixture_url.clone() });
        }
        options.fetch_timeout_ms = self.fetch_timeout_ms;
        options.max_docs_to_load = self.max_docs;
        options
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = Arc::new(cli.options());

    match cli.server_type {
        ServerType::Sse => server::start_sse_server(&cli.address, options).await?,
        ServerType::Stdio => server::start_stdio_server(options).await?,
    }

    Ok(())
}
