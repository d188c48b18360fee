//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use elastic_proxy::config::{ForwardStrategy, ProxyConfig};
use elastic_proxy::http::HttpServer;
use elastic_proxy::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const STRATEGIES: [ForwardStrategy; 2] = [ForwardStrategy::Delegate, ForwardStrategy::Manual];

/// Body returned by the mock backend for ordinary requests.
pub const MOCK_BODY: &str = r#"{"cluster_name":"mock","status":"green","hits":{"total":1}}"#;
pub const MOCK_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// How long `/slow` requests stall before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(3);

/// Chunks served by `/cloudstats/stream`, one per [`STREAM_INTERVAL`].
pub const STREAM_CHUNKS: u32 = 100;
pub const STREAM_INTERVAL: Duration = Duration::from_millis(50);

/// First chunk of `/cloudstats/broken` before the backend resets.
pub const BROKEN_PREFIX: &[u8] = b"{\"hits\":[";

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn host(&self) -> Option<&str> {
        self.headers.get(header::HOST).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone, Default)]
struct BackendState {
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Recorded>>>,
    streams_abandoned: Arc<AtomicUsize>,
}

/// Counts a streamed body as abandoned if it is dropped before its last chunk.
struct StreamWatch {
    finished: bool,
    abandoned: Arc<AtomicUsize>,
}

impl Drop for StreamWatch {
    fn drop(&mut self) {
        if !self.finished {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn slow_stream(abandoned: Arc<AtomicUsize>) -> Body {
    let watch = StreamWatch {
        finished: false,
        abandoned,
    };
    let chunks = futures_util::stream::unfold((0, watch), |(n, mut watch)| async move {
        if n == STREAM_CHUNKS {
            watch.finished = true;
            return None;
        }
        if n > 0 {
            tokio::time::sleep(STREAM_INTERVAL).await;
        }
        let chunk = Bytes::from(format!("{{\"chunk\":{n}}}\n"));
        Some((Ok::<_, std::io::Error>(chunk), (n + 1, watch)))
    });
    Body::from_stream(chunks)
}

fn broken_stream() -> Body {
    let chunks = futures_util::stream::unfold(0u8, |step| async move {
        match step {
            0 => Some((Ok(Bytes::from_static(BROKEN_PREFIX)), 1)),
            1 => {
                // Let the headers and first chunk reach the wire first.
                tokio::time::sleep(Duration::from_millis(100)).await;
                let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "backend crashed");
                Some((Err::<Bytes, _>(reset), 2))
            }
            _ => None,
        }
    });
    Body::from_stream(chunks)
}

/// Elasticsearch stand-in that records everything it receives.
///
/// - paths ending in `/slow` answer after [`SLOW_DELAY`]
/// - `/cloudstats/status/<code>` answers with that status
/// - `/cloudstats/stream` streams [`STREAM_CHUNKS`] chunks slowly
/// - `/cloudstats/broken` sends [`BROKEN_PREFIX`] then resets the connection
/// - everything else answers 200 with [`MOCK_BODY`]
pub struct MockBackend {
    pub addr: SocketAddr,
    state: BackendState,
}

impl MockBackend {
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("backend saw no requests")
    }

    /// Streamed bodies dropped before their last chunk was produced.
    pub fn streams_abandoned(&self) -> usize {
        self.state.streams_abandoned.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

pub async fn start_mock_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = BackendState::default();

    let app = Router::new().fallback(record).with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, state }
}

async fn record(State(state): State<BackendState>, request: Request<Body>) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);

    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path = parts.uri.path().to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: parts.headers,
        body: body.to_vec(),
    });

    if path.ends_with("/slow") {
        tokio::time::sleep(SLOW_DELAY).await;
    }

    match path.as_str() {
        "/cloudstats/stream" => {
            let body = slow_stream(state.streams_abandoned.clone());
            return (StatusCode::OK, body).into_response();
        }
        "/cloudstats/broken" => return (StatusCode::OK, broken_stream()).into_response(),
        _ => {}
    }

    if let Some(code) = path.strip_prefix("/cloudstats/status/") {
        let status = code.parse().ok().and_then(|c| StatusCode::from_u16(c).ok());
        return status.unwrap_or(StatusCode::BAD_REQUEST).into_response();
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, MOCK_CONTENT_TYPE),
            (header::HeaderName::from_static("x-elastic-product"), "Elasticsearch"),
        ],
        MOCK_BODY,
    )
        .into_response()
}

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn proxy_config(backend_url: &str, strategy: ForwardStrategy) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backend.url = backend_url.to_string();
    config.backend.strategy = strategy;
    config
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestProxy {
        addr,
        shutdown,
        handle,
    }
}

/// Client that never reuses connections or consults proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Send `GET <target>` over a raw socket and return the whole response.
///
/// HTTP clients normalize and re-encode the target before sending, so tests
/// that depend on the exact request line go through here.
pub async fn raw_get(addr: SocketAddr, target: &str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {target} HTTP/1.1\r\nHost: proxy\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// A local address with nothing listening on it.
pub fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
