//! [`PageFetcher`] implementations.
//!
//! [`HttpFetcher`] talks to the upstream site with a browser-like user
//! agent. [`MemoryFetcher`] serves pre-recorded pages, which lets the whole
//! pipeline run offline against saved markup.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::{PageFetcher, ScrapeError};

/// Default user agent sent with every upstream request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Fetches pages over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher that sends `user_agent` and `Accept: text/html`,
    /// giving up on a single request after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Client`] if the client cannot be built.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ScrapeError::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        log::debug!("GET {url}");

        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|source| ScrapeError::Network {
                    url: url.to_string(),
                    source,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::UpstreamUnavailable {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| ScrapeError::Network {
            url: url.to_string(),
            source,
        })
    }
}

/// A canned response held by a [`MemoryFetcher`].
#[derive(Debug, Clone)]
enum CannedPage {
    Body(String),
    Status(u16),
}

/// Serves pages from memory. Unknown URLs answer with HTTP 404.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    pages: BTreeMap<String, CannedPage>,
    requests: AtomicUsize,
}

impl MemoryFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a successful response body for `url`.
    #[must_use]
    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages
            .insert(url.to_owned(), CannedPage::Body(body.to_owned()));
        self
    }

    /// Registers a failing HTTP status for `url`.
    #[must_use]
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_owned(), CannedPage::Status(status));
        self
    }

    /// Number of fetches served so far, including failures.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(CannedPage::Body(body)) => Ok(body.clone()),
            Some(CannedPage::Status(status)) => Err(ScrapeError::UpstreamUnavailable {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(ScrapeError::UpstreamUnavailable {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    use super::*;

    /// Answers a single HTTP request on a local port and returns its URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{addr}/26/club-squad/gen5-1/")
    }

    fn http_fetcher() -> HttpFetcher {
        HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn http_fetcher_returns_body_on_success() {
        let url = serve_once("200 OK", "<h1>Squad</h1>").await;
        assert_eq!(http_fetcher().fetch(&url).await.unwrap(), "<h1>Squad</h1>");
    }

    #[tokio::test]
    async fn http_fetcher_maps_error_status_to_upstream_unavailable() {
        let url = serve_once("503 Service Unavailable", "down").await;
        match http_fetcher().fetch(&url).await {
            Err(ScrapeError::UpstreamUnavailable { url: failed, status }) => {
                assert_eq!(status, 503);
                assert_eq!(failed, url);
            }
            other => panic!("expected UpstreamUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_fetcher_reports_refused_connection_as_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/");
        let err = http_fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Network { .. }), "{err:?}");
        assert_eq!(err.url(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn memory_fetcher_serves_registered_pages() {
        let fetcher = MemoryFetcher::new()
            .with_page("https://example.com/a", "<h1>A</h1>")
            .with_status("https://example.com/b", 500);

        assert_eq!(
            fetcher.fetch("https://example.com/a").await.unwrap(),
            "<h1>A</h1>"
        );

        match fetcher.fetch("https://example.com/b").await {
            Err(ScrapeError::UpstreamUnavailable { status, url }) => {
                assert_eq!(status, 500);
                assert_eq!(url, "https://example.com/b");
            }
            other => panic!("expected UpstreamUnavailable, got {other:?}"),
        }

        assert!(matches!(
            fetcher.fetch("https://example.com/missing").await,
            Err(ScrapeError::UpstreamUnavailable { status: 404, .. })
        ));
        assert_eq!(fetcher.request_count(), 3);
    }

    #[test]
    fn http_fetcher_builds_with_defaults() {
        assert!(HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).is_ok());
    }
}
