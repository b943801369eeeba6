//! Configuration for the listing pipeline.
//!
//! A config file (`fsbo.toml`, `fsbo.json` or `fsbo.yaml`) is discovered with
//! the prefer crate or passed explicitly; environment variables and CLI flags
//! are layered on top.

pub mod browser;
mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scrapers::{FetcherKind, ListingSelectors, RetryPolicy};

pub use browser::BrowserEngineConfig;

/// Smallest number of pages a run may request.
pub const MIN_PAGES: u32 = 1;
/// Largest number of pages a run may request.
pub const MAX_PAGES: u32 = 20;
/// Pages fetched when nothing is configured.
pub const DEFAULT_PAGES: u32 = 5;
/// Pause after every page, in seconds.
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 30;
/// Static fetcher request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Upper bound on a whole fetch (including browser launch), in seconds.
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 120;
/// Export filename when no output is configured.
pub const DEFAULT_OUTPUT: &str = "charlotte_fsbo_listings.csv";

/// Errors that make a run invalid before any page is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("page count must be a whole number between 1 and 20, got '{0}'")]
    PageCount(String),
    #[error("no URL template configured (set url_template, FSBO_URL_TEMPLATE or --template)")]
    EmptyTemplate,
    #[error("invalid CSS selector for {field}: '{selector}'")]
    InvalidSelector {
        field: &'static str,
        selector: String,
    },
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("failed to load config: {0}")]
    Load(String),
}

/// Parse a page count supplied as text and check it is within bounds.
pub fn parse_page_count(raw: &str) -> Result<u32, ConfigError> {
    let pages: u32 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::PageCount(raw.to_string()))?;
    validate_page_count(pages)
}

/// Check that a page count is within [`MIN_PAGES`, `MAX_PAGES`].
pub fn validate_page_count(pages: u32) -> Result<u32, ConfigError> {
    if (MIN_PAGES..=MAX_PAGES).contains(&pages) {
        Ok(pages)
    } else {
        Err(ConfigError::PageCount(pages.to_string()))
    }
}

/// Optional search filters, kept as the raw text the user typed.
///
/// They are not validated or applied here; filtering is encoded into the URL
/// template by whoever builds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Price range, e.g. "200000,500000".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Square footage range, e.g. "1500,3000".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqft: Option<String>,
    /// Bedroom range, e.g. "3,5".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.sqft.is_none() && self.beds.is_none()
    }

    /// Overlay any filters set in `other`.
    pub fn merge(&mut self, other: SearchFilters) {
        if other.price.is_some() {
            self.price = other.price;
        }
        if other.sqft.is_some() {
            self.sqft = other.sqft;
        }
        if other.beds.is_some() {
            self.beds = other.beds;
        }
    }
}

impl std::fmt::Display for SearchFilters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let parts: Vec<String> = [
            ("price", &self.price),
            ("sqft", &self.sqft),
            ("beds", &self.beds),
        ]
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| format!("{}={}", name, v)))
        .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Search URL with the encoded query state; `&page=<n>` is appended per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,
    /// Number of pages to fetch (1-20).
    #[serde(default = "default_pages")]
    pub pages: u32,
    /// Delay after every page in seconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_secs: u64,
    /// Static fetcher request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Upper bound on one fetch attempt in seconds.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
    /// Fetch backend.
    #[serde(default)]
    pub fetcher: FetcherKind,
    /// User agent for the static fetcher.
    /// - None: default fsbo user agent
    /// - "impersonate": random real browser user agent
    /// - other: used verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Export file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Resolve relative listing links against the page URL. Off keeps the
    /// `href` exactly as written.
    #[serde(default)]
    pub resolve_links: bool,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub selectors: ListingSelectors,
    #[serde(default, skip_serializing_if = "SearchFilters::is_empty")]
    pub filters: SearchFilters,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_pages() -> u32 {
    DEFAULT_PAGES
}

fn default_request_delay() -> u64 {
    DEFAULT_REQUEST_DELAY_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_page_timeout() -> u64 {
    DEFAULT_PAGE_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_template: None,
            pages: DEFAULT_PAGES,
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            page_timeout_secs: DEFAULT_PAGE_TIMEOUT_SECS,
            fetcher: FetcherKind::default(),
            user_agent: None,
            output: None,
            resolve_links: false,
            browser: BrowserEngineConfig::default(),
            retry: RetryPolicy::default(),
            selectors: ListingSelectors::default(),
            filters: SearchFilters::default(),
            source_path: None,
        }
    }
}

impl Config {
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// Bound on one fetch attempt. Never shorter than the request timeout,
    /// so a long `--timeout` is not cut off by the page timeout.
    pub fn fetch_timeout(&self) -> Duration {
        self.page_timeout().max(self.request_timeout())
    }

    /// Reject timeouts that would fail every fetch.
    pub fn validate_timeouts(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("request_timeout_secs"));
        }
        if self.page_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("page_timeout_secs"));
        }
        Ok(())
    }

    /// Export path with `~` expanded.
    pub fn output_path(&self) -> PathBuf {
        let raw = self.output.as_deref().unwrap_or(DEFAULT_OUTPUT);
        PathBuf::from(shellexpand::tilde(raw).as_ref())
    }

    /// Selector the browser waits for before reading the page.
    pub fn browser_wait_selector(&self) -> String {
        self.browser
            .wait_for_selector
            .clone()
            .unwrap_or_else(|| self.selectors.container.clone())
    }

    /// Apply environment variable overrides.
    ///
    /// - `FSBO_URL_TEMPLATE` - search URL template
    /// - browser overrides, see [`BrowserEngineConfig::with_env_overrides`]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("FSBO_URL_TEMPLATE") {
            if !val.is_empty() {
                self.url_template = Some(val);
            }
        }
        self.browser = self.browser.with_env_overrides();
        self
    }
}
