//! Page fetchers, listing extraction and request throttling.

pub mod browser;
pub mod extract;
mod http_client;
pub mod throttle;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

pub use browser::BrowserFetcher;
pub use extract::{Extraction, Extractor, ListingSelectors, SkippedContainer};
pub use http_client::{random_user_agent, resolve_user_agent, StaticFetcher};
pub use throttle::{RetryPolicy, Throttle, ThrottledFetch};

/// Why a page could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// Network error, timeout or non-2xx status.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Browser launch, navigation or selector wait failed.
    #[error("render failure: {0}")]
    Render(String),
}

/// Raw page markup, or the reason it could not be retrieved.
pub type FetchResult = Result<String, FetchFailure>;

/// Retrieves the raw content of a results page.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> FetchResult;
}

/// Fetch backend selected by configuration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    /// Plain HTTP request per page.
    #[default]
    Static,
    /// Headless Chrome session per page.
    Browser,
}

impl std::fmt::Display for FetcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Browser => write!(f, "browser"),
        }
    }
}

/// Build the fetcher selected in `config`.
pub fn build_fetcher(config: &Config) -> anyhow::Result<Arc<dyn Fetcher>> {
    let fetcher: Arc<dyn Fetcher> = match config.fetcher {
        FetcherKind::Static => Arc::new(StaticFetcher::new(
            config.request_timeout(),
            config.user_agent.as_deref(),
        )?),
        FetcherKind::Browser => Arc::new(BrowserFetcher::new(
            config.browser.clone(),
            config.browser_wait_selector(),
        )),
    };
    Ok(fetcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_kind_from_config_text() {
        let kind: FetcherKind = serde_json::from_str("\"browser\"").unwrap();
        assert_eq!(kind, FetcherKind::Browser);
        assert_eq!(kind.to_string(), "browser");
    }

    #[test]
    fn test_build_fetcher_respects_kind() {
        let mut config = Config::default();
        assert_eq!(build_fetcher(&config).unwrap().name(), "static");

        config.fetcher = FetcherKind::Browser;
        assert_eq!(build_fetcher(&config).unwrap().name(), "browser");
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(
            FetchFailure::Transport("HTTP 403".into()).to_string(),
            "transport failure: HTTP 403"
        );
        assert_eq!(
            FetchFailure::Render("selector timeout".into()).to_string(),
            "render failure: selector timeout"
        );
    }
}
