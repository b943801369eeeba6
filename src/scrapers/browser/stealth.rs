//! Stealth evasion scripts and block detection.

use chromiumoxide::Page;
use tracing::debug;

/// Stealth evasion JavaScript to inject into pages.
/// Based on puppeteer-extra-plugin-stealth techniques.
const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    window.chrome = {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // Fix plugins
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' }
        ],
        configurable: true
    });
    "#,
    // Fix languages
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
];

/// Markers that show up on interstitial and denial pages.
const BLOCK_INDICATORS: &[&str] = &[
    "Access Denied",
    "blocked",
    "px-captcha",
    "Please verify you are a human",
];

/// Apply stealth evasion scripts to a page. Failures are not fatal.
pub async fn apply_stealth(page: &Page) {
    debug!("Applying stealth scripts");

    for script in STEALTH_SCRIPTS {
        if let Err(e) = page.evaluate(script.to_string()).await {
            debug!("Stealth script injection skipped: {}", e);
        }
    }
}

/// First block indicator found in `content`, if any.
pub fn block_indicator(content: &str) -> Option<&'static str> {
    BLOCK_INDICATORS
        .iter()
        .copied()
        .find(|marker| content.contains(marker))
}
