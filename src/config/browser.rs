//! Browser engine configuration types.
//!
//! These types live here (always compiled) rather than behind
//! `#[cfg(feature = "browser")]` so that config parsing and serialization work
//! without the browser feature.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Headless browser settings for the browser fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false for debugging or if headless detection is an issue.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Chrome/Chromium executable. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Navigation timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Wait for this CSS selector before reading the page.
    /// Defaults to the listing container selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,

    /// How long to wait for the selector, in seconds.
    #[serde(default = "default_timeout")]
    pub selector_timeout: u64,

    /// Inject stealth evasion scripts after navigation.
    #[serde(default = "default_stealth")]
    pub stealth: bool,

    /// Additional Chrome arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

fn default_stealth() -> bool {
    true
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            proxy: None,
            timeout: default_timeout(),
            wait_for_selector: None,
            selector_timeout: default_timeout(),
            stealth: default_stealth(),
            chrome_args: Vec::new(),
        }
    }
}

impl BrowserEngineConfig {
    /// Apply environment variable overrides.
    ///
    /// - `CHROME_PATH` - Chrome/Chromium executable
    /// - `SOCKS_PROXY` - SOCKS proxy for browser traffic (e.g., "socks5://127.0.0.1:9050")
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("CHROME_PATH") {
            if !val.is_empty() {
                self.chrome_path = Some(PathBuf::from(val));
            }
        }

        if self.proxy.is_none() {
            if let Ok(val) = std::env::var("SOCKS_PROXY") {
                if !val.is_empty() {
                    self.proxy = Some(val);
                }
            }
        }

        self
    }
}
