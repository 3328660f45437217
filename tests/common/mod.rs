//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image_proxy::config::{AuthMode, ProxyConfig};
use image_proxy::http::HttpServer;
use image_proxy::lifecycle::Shutdown;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

pub const TOKEN: &str = "MY_SECRET_ACCESS_TOKEN";

/// A canned upstream reply.
#[derive(Clone)]
pub struct MockResponse {
    pub status_line: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status_line: &'static str, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        let headers = content_type
            .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
            .unwrap_or_default();
        Self {
            status_line,
            headers,
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// A mock origin server counting the requests it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Read the request head so closing the socket never resets an unread request.
async fn read_request_head(stream: &mut TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return None,
            Ok(_) => {
                if line == "\r\n" {
                    return Some(head);
                }
                head.push_str(&line);
            }
        }
    }
}

/// Start a mock upstream answering every request with `response`.
pub async fn start_upstream(response: MockResponse) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let response = response.clone();
            let counter = counter.clone();
            tokio::spawn(async move {
                if read_request_head(&mut socket).await.is_none() {
                    return;
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let mut head = format!("HTTP/1.1 {}\r\n", response.status_line);
                for (name, value) in &response.headers {
                    head.push_str(&format!("{}: {}\r\n", name, value));
                }
                head.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    response.body.len()
                ));

                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&response.body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, hits }
}

/// Start a mock upstream that sends `first` as one chunk, waits for `release`,
/// then sends `rest` and ends the chunked body.
pub async fn start_gated_upstream(
    content_type: &'static str,
    first: Vec<u8>,
    rest: Vec<u8>,
    release: Arc<Notify>,
) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        if read_request_head(&mut socket).await.is_none() {
            return;
        }
        counter.fetch_add(1, Ordering::SeqCst);

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
            content_type
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = write_chunk(&mut socket, &first).await;
        let _ = socket.flush().await;

        release.notified().await;

        for chunk in rest.chunks(64 * 1024) {
            if write_chunk(&mut socket, chunk).await.is_err() {
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
        let _ = socket.shutdown().await;
    });

    MockUpstream { addr, hits }
}

/// Start a mock upstream that promises a large body, sends `sent` bytes,
/// waits for `release`, then closes the connection early.
pub async fn start_truncating_upstream(
    content_type: &'static str,
    sent: usize,
    release: Arc<Notify>,
) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        if read_request_head(&mut socket).await.is_none() {
            return;
        }
        counter.fetch_add(1, Ordering::SeqCst);

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            content_type,
            sent * 100
        );
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&vec![0xAB; sent]).await;
        let _ = socket.flush().await;

        release.notified().await;
        let _ = socket.shutdown().await;
    });

    MockUpstream { addr, hits }
}

/// Start a mock upstream that streams 16 KiB chunks every 5 ms until a write
/// fails, then signals `closed`.
pub async fn start_endless_upstream(content_type: &'static str, closed: Arc<Notify>) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        if read_request_head(&mut socket).await.is_none() {
            return;
        }
        counter.fetch_add(1, Ordering::SeqCst);

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\n\r\n",
            content_type
        );
        if socket.write_all(head.as_bytes()).await.is_ok() {
            let chunk = vec![0x5A; 16 * 1024];
            while write_chunk(&mut socket, &chunk).await.is_ok() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        }
        closed.notify_one();
    });

    MockUpstream { addr, hits }
}

async fn write_chunk(socket: &mut TcpStream, chunk: &[u8]) -> std::io::Result<()> {
    socket
        .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
        .await?;
    socket.write_all(chunk).await?;
    socket.write_all(b"\r\n").await
}

/// Config for a proxy guarded by `TOKEN`, listening on an ephemeral port.
pub fn proxy_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.auth.mode = AuthMode::SharedSecret;
    config.auth.access_token = Some(TOKEN.to_string());
    config.upstream.timeout_secs = 10;
    config
}

/// A running proxy; dropping it shuts the server down.
pub struct TestProxy {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl TestProxy {
    /// Proxy URL for `target`, with the given query string appended verbatim.
    pub fn url(&self, target: &str, query: &str) -> String {
        let encoded = urlencoding::encode(target);
        if query.is_empty() {
            format!("http://{}/{}", self.addr, encoded)
        } else {
            format!("http://{}/{}?{}", self.addr, encoded, query)
        }
    }

    pub fn authorized_url(&self, target: &str) -> String {
        self.url(target, &format!("access_token={}", TOKEN))
    }
}

pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy {
        addr,
        _shutdown: shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
