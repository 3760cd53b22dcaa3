//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use rewrite_proxy::config::ProxyConfig;
use rewrite_proxy::{encode, HttpServer, Shutdown};

/// A canned upstream response.
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Requests seen by a mock upstream: raw head (request line + headers) and body.
#[derive(Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<(String, Vec<u8>)>>>);

impl Recorded {
    pub fn heads(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(h, _)| h.clone()).collect()
    }

    pub fn last_head(&self) -> String {
        self.heads().pop().expect("upstream saw no request")
    }

    pub fn last_body(&self) -> Vec<u8> {
        self.0
            .lock()
            .unwrap()
            .last()
            .map(|(_, b)| b.clone())
            .expect("upstream saw no request")
    }
}

/// Start a mock upstream on an ephemeral port.
///
/// `respond` gets the request head and picks the response.
pub async fn start_mock_upstream<F>(respond: F) -> (SocketAddr, Recorded)
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Recorded::default();
    let respond = Arc::new(respond);

    let seen = recorded.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let _ = serve_one(socket, respond.as_ref(), &seen).await;
            });
        }
    });

    (addr, recorded)
}

async fn serve_one<F>(mut socket: TcpStream, respond: &F, seen: &Recorded) -> std::io::Result<()>
where
    F: Fn(&str) -> MockResponse,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let response = respond(&head);
    seen.0.lock().unwrap().push((head, body));

    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status, reason(response.status));
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        response.body.len()
    ));

    socket.write_all(out.as_bytes()).await?;
    socket.write_all(&response.body).await?;
    socket.shutdown().await
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

/// Request path of a raw request head, e.g. `/search?q=rust`.
pub fn request_path(head: &str) -> &str {
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// A client that talks to the proxy directly and never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// `http://{proxy}{prefix}{encode(target)}`
pub fn proxied_url(proxy: SocketAddr, target: &str) -> String {
    format!("http://{proxy}/uv/service/{}", encode(&Url::parse(target).unwrap()))
}

/// The prefix-relative address the rewriter emits for `target`.
pub fn address_for(target: &str) -> String {
    format!("/uv/service/{}", encode(&Url::parse(target).unwrap()))
}

/// The address the proxy at `proxy` emits for `target` when reached directly.
pub fn proxy_address_for(proxy: SocketAddr, target: &str) -> String {
    format!("http://{proxy}{}", address_for(target))
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
