//! One-shot headless Chrome sessions.

use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::binary::find_chrome;
use super::stealth::{apply_stealth, block_indicator};
use crate::config::BrowserEngineConfig;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A launched browser owned by a single fetch.
///
/// Call [`close`](Self::close) on the normal path. If the session is dropped
/// instead (the fetch future was cancelled or timed out), the CDP handler task
/// is aborted and chromiumoxide kills the Chrome process.
pub(super) struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(config: &BrowserEngineConfig) -> Result<Self> {
        let chrome_path = find_chrome(config.chrome_path.as_deref())?;

        info!("Launching browser (headless={})", config.headless);

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Load `url` in a fresh tab and return the rendered HTML once
    /// `wait_selector` is present.
    pub async fn render(
        &self,
        url: &str,
        user_agent: &str,
        wait_selector: &str,
        config: &BrowserEngineConfig,
    ) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open tab")?;

        let result = render_page(&page, url, user_agent, wait_selector, config).await;

        let _ = page.close().await;
        result
    }

    /// Shut Chrome down and stop the handler task.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

async fn render_page(
    page: &Page,
    url: &str,
    user_agent: &str,
    wait_selector: &str,
    config: &BrowserEngineConfig,
) -> Result<String> {
    // Must be set before any navigation
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await
        .context("Failed to set user agent")?;

    info!("Navigating to {}", url);
    let nav_params = NavigateParams::builder()
        .url(url)
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid URL: {}", e))?;

    let nav_timeout = Duration::from_secs(config.timeout);
    let navigation = tokio::time::timeout(nav_timeout, page.execute(nav_params))
        .await
        .map_err(|_| anyhow::anyhow!("Navigation timed out after {:?}", nav_timeout))?
        .context("Navigation failed")?;

    if let Some(ref error) = navigation.result.error_text {
        anyhow::bail!("Navigation failed: {}", error);
    }

    if config.stealth {
        apply_stealth(page).await;
    }

    let selector_timeout = Duration::from_secs(config.selector_timeout);
    debug!("Waiting for selector: {}", wait_selector);
    tokio::time::timeout(selector_timeout, async {
        while page.find_element(wait_selector).await.is_err() {
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    })
    .await
    .map_err(|_| {
        anyhow::anyhow!(
            "Timed out after {:?} waiting for selector '{}'",
            selector_timeout,
            wait_selector
        )
    })?;
    debug!("Selector found");

    let content = page.content().await.context("Failed to read page content")?;

    if let Some(marker) = block_indicator(&content) {
        warn!("Page may be blocked: {} (contains '{}')", url, marker);
    }

    Ok(content)
}
