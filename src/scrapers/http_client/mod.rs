//! Static HTTP fetcher.

mod user_agent;

pub use user_agent::{random_user_agent, resolve_user_agent};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{FetchFailure, FetchResult, Fetcher};

/// Fetches a page with a single GET request.
///
/// Any transport error or non-2xx status is a failure. No cookies or other
/// session state are kept between calls.
#[derive(Clone)]
pub struct StaticFetcher {
    client: Client,
    timeout: Duration,
}

impl StaticFetcher {
    /// Create a fetcher with the given request timeout.
    /// - None: default fsbo user agent
    /// - Some("impersonate"): random real browser user agent
    /// - Some(custom): custom user agent string
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        let start = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchFailure::Transport(format!("request timed out after {:?}", self.timeout))
            } else {
                FetchFailure::Transport(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Transport(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Transport(format!("failed to read body: {}", e)))?;

        debug!(
            "Fetched {} ({} bytes) in {:?}",
            url,
            body.len(),
            start.elapsed()
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the URL to request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/search?q=1&page=1", addr)
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let url = serve_once("200 OK", "<div class=\"list-card\"></div>").await;
        let fetcher = StaticFetcher::new(Duration::from_secs(5), None).unwrap();

        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<div class=\"list-card\"></div>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_failure() {
        let url = serve_once("403 Forbidden", "blocked").await;
        let fetcher = StaticFetcher::new(Duration::from_secs(5), None).unwrap();

        match fetcher.fetch(&url).await {
            Err(FetchFailure::Transport(reason)) => assert!(reason.contains("403")),
            other => panic!("expected transport failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_failure() {
        // Bind then drop to get a port nothing listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let fetcher = StaticFetcher::new(Duration::from_secs(5), None).unwrap();

        let result = fetcher.fetch(&format!("http://{}/", addr)).await;
        assert!(matches!(result, Err(FetchFailure::Transport(_))));
    }
}
