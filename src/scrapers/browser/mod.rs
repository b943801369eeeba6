//! Browser-based fetcher for script-rendered results pages.
//!
//! Uses chromiumoxide (CDP) with stealth evasion scripts. Every fetch gets its
//! own Chrome process and a freshly chosen user agent; nothing is shared
//! between pages.

#[cfg(feature = "browser")]
mod binary;
#[cfg(feature = "browser")]
mod fetch;
#[cfg(feature = "browser")]
mod stealth;

use async_trait::async_trait;

use super::{FetchFailure, FetchResult, Fetcher};
use crate::config::BrowserEngineConfig;

/// Fetcher that renders each page in headless Chrome.
pub struct BrowserFetcher {
    config: BrowserEngineConfig,
    wait_selector: String,
}

impl BrowserFetcher {
    /// `wait_selector` must appear in the rendered page before its content is
    /// read.
    pub fn new(config: BrowserEngineConfig, wait_selector: impl Into<String>) -> Self {
        Self {
            config,
            wait_selector: wait_selector.into(),
        }
    }

    pub fn config(&self) -> &BrowserEngineConfig {
        &self.config
    }

    #[cfg(feature = "browser")]
    async fn render(&self, url: &str) -> FetchResult {
        let user_agent = super::random_user_agent();
        tracing::debug!("Browser session user agent: {}", user_agent);

        let session = fetch::BrowserSession::launch(&self.config)
            .await
            .map_err(render_failure)?;
        let result = session
            .render(url, user_agent, &self.wait_selector, &self.config)
            .await;
        session.close().await;

        result.map_err(render_failure)
    }

    #[cfg(not(feature = "browser"))]
    async fn render(&self, _url: &str) -> FetchResult {
        Err(FetchFailure::Render(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[cfg(feature = "browser")]
fn render_failure(e: anyhow::Error) -> FetchFailure {
    FetchFailure::Render(format!("{:#}", e))
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        self.render(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_launch_failure_is_render_failure() {
        let config = BrowserEngineConfig {
            chrome_path: Some("/nonexistent/chrome".into()),
            ..Default::default()
        };
        let fetcher = BrowserFetcher::new(config, "div.list-card");

        match fetcher.fetch("https://example.com/?page=1").await {
            Err(FetchFailure::Render(_)) => {}
            other => panic!("expected render failure, got {:?}", other),
        }
    }
}
