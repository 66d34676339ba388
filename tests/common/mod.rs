//! Test helpers for E2E tests.
//!
//! Provides a throwaway HTTP server that answers every request with a canned
//! response, follows a scripted redirect chain, checks the client's
//! User-Agent, or never answers at all.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use ecweather::config::FetchConfig;
use ecweather::{FeedFetcher, ReportFormatter, WeatherSource};

/// Page link used by test sources.
pub const PAGE_LINK: &str = "https://weather.gc.ca/city/pages/on-118_metric_e.html";

/// Maximum request size read before answering.
const MAX_REQUEST_SIZE: usize = 16 * 1024;

/// How the test server answers.
#[derive(Clone)]
enum Behavior {
    Respond { status: u16, body: Vec<u8> },
    /// `/hop/N` redirects to `/hop/N-1`; `/hop/0` and anything else serve `body`.
    Redirects { body: Vec<u8> },
    /// Serve `body` only to clients sending this User-Agent, 403 otherwise.
    RequireUserAgent { user_agent: String, body: Vec<u8> },
    Silent,
}

/// Local HTTP server for feed tests. Stops when dropped.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    disconnected: Arc<Notify>,
}

impl TestServer {
    /// Start a server answering every request with `status` and `body`.
    pub async fn respond(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::start(Behavior::Respond {
            status,
            body: body.into(),
        })
        .await
    }

    /// Start a server that serves `body` at the end of a `/hop/N` redirect chain.
    pub async fn redirects(body: impl Into<Vec<u8>>) -> Self {
        Self::start(Behavior::Redirects { body: body.into() }).await
    }

    /// Start a server that serves `body` only to `user_agent`.
    pub async fn require_user_agent(user_agent: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::start(Behavior::RequireUserAgent {
            user_agent: user_agent.to_string(),
            body: body.into(),
        })
        .await
    }

    /// Start a server that accepts connections but never answers.
    pub async fn silent() -> Self {
        Self::start(Behavior::Silent).await
    }

    async fn start(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let disconnected = Arc::new(Notify::new());

        let notify = disconnected.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let behavior = behavior.clone();
                let notify = notify.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, behavior, notify).await;
                });
            }
        });

        Self {
            addr,
            handle,
            disconnected,
        }
    }

    /// URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait until a client of a silent server closes its connection.
    pub async fn wait_for_disconnect(&self) {
        self.disconnected.notified().await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    behavior: Behavior,
    disconnected: Arc<Notify>,
) -> std::io::Result<()> {
    let request = read_request(&mut stream).await?;

    match behavior {
        Behavior::Respond { status, body } => write_response(&mut stream, status, &[], &body).await,
        Behavior::Redirects { body } => match hops_left(&request) {
            Some(n) if n > 0 => {
                let location = format!("Location: /hop/{}", n - 1);
                write_response(&mut stream, 302, &[location.as_str()], b"").await
            }
            _ => write_response(&mut stream, 200, &[], &body).await,
        },
        Behavior::RequireUserAgent { user_agent, body } => {
            if header(&request, "user-agent").as_deref() == Some(user_agent.as_str()) {
                write_response(&mut stream, 200, &[], &body).await
            } else {
                write_response(&mut stream, 403, &[], b"").await
            }
        }
        Behavior::Silent => {
            // Hold the connection open until the client gives up.
            let mut buf = [0u8; 1024];
            while stream.read(&mut buf).await.unwrap_or(0) > 0 {}
            disconnected.notify_one();
            Ok(())
        }
    }
}

async fn write_response(
    stream: &mut TcpStream,
    status: u16,
    headers: &[&str],
    body: &[u8],
) -> std::io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/xml; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        reason_phrase(status),
        body.len()
    );
    for line in headers {
        head.push_str(line);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;
    stream.shutdown().await
}

/// Read until the end of the request headers.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];

    while !request.windows(4).any(|w| w == b"\r\n\r\n") && request.len() < MAX_REQUEST_SIZE {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }

    Ok(String::from_utf8_lossy(&request).into_owned())
}

/// Remaining hops for a `GET /hop/N` request.
fn hops_left(request: &str) -> Option<u32> {
    let path = request.lines().next()?.split_whitespace().nth(1)?;
    path.strip_prefix("/hop/")?.parse().ok()
}

fn header(request: &str, name: &str) -> Option<String> {
    request.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Build a source for `feed_url` with custom fetch settings.
pub fn source_with_fetch(region_code: &str, feed_url: &str, fetch: &FetchConfig) -> WeatherSource {
    WeatherSource::with_parts(
        region_code,
        feed_url,
        PAGE_LINK,
        FeedFetcher::from_config(fetch).unwrap(),
        ReportFormatter::default(),
    )
    .unwrap()
}

/// Build a source for `feed_url` with default settings.
pub fn source(region_code: &str, feed_url: &str) -> WeatherSource {
    WeatherSource::new(region_code, feed_url, PAGE_LINK).unwrap()
}
