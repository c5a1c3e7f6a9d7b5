use pf_docs_mcp::config::{Mode, Options};
use pf_docs_mcp::mcp::{DocsRequest, DocsServer, parse_resource_uri};
use serde_json::{Value, json};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{ChildStdin, ChildStdout, Command};

fn write_docs(root: &Path) {
    let docs = root.join("documentation");
    std::fs::create_dir_all(docs.join("guidelines")).unwrap();
    std::fs::create_dir_all(docs.join("components")).unwrap();
    std::fs::write(docs.join("guidelines/README.md"), "Guidelines body").unwrap();
    std::fs::write(docs.join("components/README.md"), "Components body").unwrap();
}

fn text_of(result: &rmcp::model::CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| c.as_text().map(|t| t.text.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_fetch_docs_mixes_remote_and_local() {
    let mut server = mockito::Server::new_async().await;
    let remote = server
        .mock("GET", "/react/button.md")
        .with_status(200)
        .with_body("Remote button docs")
        .expect(1)
        .create_async()
        .await;
    let _missing = server.mock("GET", "/react/nope.md").with_status(404).create_async().await;

    let dir = tempfile::tempdir().unwrap();
    write_docs(dir.path());
    let docs = DocsServer::build(Arc::new(Options::with_context_path(dir.path()))).await;

    let request = || DocsRequest {
        url_list: vec![
            format!("{}/react/button.md", server.url()),
            "documentation:guidelines/README.md".to_string(),
            format!("{}/react/nope.md", server.url()),
        ],
    };

    let text = text_of(&docs.fetch_docs(request()).await.unwrap());
    assert!(text.starts_with("# Fetched Documentation"));
    assert!(text.contains("Remote button docs"));
    assert!(text.contains("Guidelines body"));
    assert!(text.contains("HTTP 404"));

    // Second call is served from the cache.
    docs.fetch_docs(request()).await.unwrap();
    remote.assert_async().await;
}

#[tokio::test]
async fn test_fixture_mode_serves_named_resource() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    write_docs(dir.path());
    let expected_path = dir.path().join("documentation/components/README.md");

    let fixture = server
        .mock("GET", "/fixture")
        .match_query(mockito::Matcher::UrlEncoded(
            "path".to_string(),
            expected_path.to_string_lossy().into_owned(),
        ))
        .with_body("Fixture components")
        .create_async()
        .await;

    let options = Options::with_context_path(dir.path()).mode(Mode::Test {
        fixture_url: format!("{}/fixture", server.url()),
    });
    let docs = DocsServer::build(Arc::new(options)).await;

    let variables = parse_resource_uri("patternfly-docs://components").unwrap();
    assert_eq!(docs.read_named_doc(&variables).await.unwrap(), "Fixture components");
    fixture.assert_async().await;
}

struct StdioClient {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl StdioClient {
    async fn send(&mut self, message: Value) {
        let line = format!("{message}\n");
        self.stdin.write_all(line.as_bytes()).await.unwrap();
        self.stdin.flush().await.unwrap();
    }

    async fn response(&mut self, id: u64) -> Value {
        loop {
            let line = tokio::time::timeout(Duration::from_secs(10), self.lines.next_line())
                .await
                .expect("timed out waiting for server")
                .unwrap()
                .expect("server closed stdout");
            let message: Value = serde_json::from_str(&line).unwrap();
            if message["id"] == json!(id) {
                return message;
            }
        }
    }
}

#[tokio::test]
async fn test_stdio_server_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_docs(dir.path());

    let mut child = Command::new(env!("CARGO_BIN_EXE_pf-docs-mcp"))
        .args(["--server-type", "stdio", "--context-path"])
        .arg(dir.path())
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to start server");

    let mut client = StdioClient {
        stdin: child.stdin.take().unwrap(),
        lines: BufReader::new(child.stdout.take().unwrap()).lines(),
    };

    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "integration test", "version": "0.0.1" }
            }
        }))
        .await;
    let init = client.response(1).await;
    assert_eq!(init["result"]["serverInfo"]["name"], "pf-docs-mcp");
    assert!(init["result"]["capabilities"]["tools"].is_object());
    assert!(init["result"]["capabilities"]["resources"].is_object());

    client
        .send(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .await;

    client
        .send(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list", "params": {} }))
        .await;
    let tools = client.response(2).await;
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert!(names.contains(&"usePatternFlyDocs"));
    assert!(names.contains(&"fetchDocs"));
    assert!(names.contains(&"searchPatternFlyDocs"));

    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "usePatternFlyDocs",
                "arguments": {
                    "urlList": [
                        "documentation:guidelines/README.md",
                        "documentation:components/README.md"
                    ]
                }
            }
        }))
        .await;
    let call = client.response(3).await;
    let text = call["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("# PatternFly Documentation"));
    let guidelines = text.find("Guidelines body").unwrap();
    let components = text.find("Components body").unwrap();
    assert!(guidelines < components);

    client
        .send(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "resources/read",
            "params": { "uri": "patternfly-docs://" }
        }))
        .await;
    let read = client.response(4).await;
    assert!(read["error"].is_object());

    child.kill().await.unwrap();
}
