//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use serde_json::Value;
use stressless_server::config::ServerConfig;
use stressless_server::http::HttpServer;
use stressless_server::lifecycle::Shutdown;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// A workbench server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
    pub handle: tokio::task::JoinHandle<()>,
    _data: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a server with test defaults, letting the caller adjust the config.
pub async fn start_server(configure: impl FnOnce(&mut ServerConfig)) -> TestServer {
    let data = tempfile::tempdir().unwrap();

    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.client.use_env_proxy = false;
    config.discovery.probe_scheme = "http".to_string();
    config.discovery.probe_timeout_secs = 5;
    config.presets.path = data.path().join("presets.json").display().to_string();
    config.static_files.root = data.path().join("web-dist").display().to_string();
    configure(&mut config);

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestServer {
        addr,
        shutdown,
        handle,
        _data: data,
    }
}

/// Serve an axum router as a mock upstream on an ephemeral port.
pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// A TCP endpoint that accepts connections and never answers.
pub async fn start_hanging_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// HTTP client for talking to the test server.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Incremental reader of an SSE response.
pub struct SseReader {
    response: reqwest::Response,
    buffer: String,
}

impl SseReader {
    pub async fn open(client: &reqwest::Client, url: &str) -> Self {
        let response = client.get(url).send().await.unwrap();
        assert_eq!(response.status(), 200);
        Self {
            response,
            buffer: String::new(),
        }
    }

    pub fn response(&self) -> &reqwest::Response {
        &self.response
    }

    /// Next `data:` payload, or `None` once the stream ends.
    pub async fn next_event(&mut self) -> Option<Value> {
        tokio::time::timeout(Duration::from_secs(15), self.read_event())
            .await
            .expect("timed out waiting for an SSE event")
    }

    async fn read_event(&mut self) -> Option<Value> {
        loop {
            while let Some(end) = self.buffer.find("\n\n") {
                let frame: String = self.buffer.drain(..end + 2).collect();
                let data: Vec<&str> = frame
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();
                // Comment frames (keep-alives) carry no data.
                if !data.is_empty() {
                    return Some(serde_json::from_str(&data.join("\n")).unwrap());
                }
            }
            match self.response.chunk().await.unwrap() {
                Some(chunk) => self.buffer.push_str(&String::from_utf8_lossy(&chunk)),
                None => return None,
            }
        }
    }

    /// Whether no event arrives within `window`.
    pub async fn is_quiet_for(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.read_event()).await.is_err()
    }

    /// Collect events up to and including `discover_finished`.
    pub async fn until_finished(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            let done = event["message"] == "discover_finished";
            events.push(event);
            if done {
                break;
            }
        }
        events
    }
}

/// `(kind, message)` pairs for compact assertions.
pub fn summarize(events: &[Value]) -> Vec<(String, String)> {
    events
        .iter()
        .map(|e| {
            (
                e["kind"].as_str().unwrap_or_default().to_string(),
                e["message"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}
