//! Listing extraction from results page markup.
//!
//! Extraction is pure: it never performs I/O and never fails once the
//! selectors have been compiled. Anything missing from a listing card
//! becomes [`NOT_AVAILABLE`](crate::models::NOT_AVAILABLE) in that field only.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ConfigError;
use crate::models::ListingRecord;

/// CSS selectors locating a listing card and its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSelectors {
    /// One match per listing card.
    pub container: String,
    pub address: String,
    pub price: String,
    /// Anchor whose `href` is the listing link.
    pub link: String,
    /// Detail items, read in order as bedrooms, bathrooms, square footage.
    pub details: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: "div.list-card".to_string(),
            address: "address".to_string(),
            price: "div.list-card-price".to_string(),
            link: "a.list-card-link".to_string(),
            details: "ul.list-card-details li".to_string(),
        }
    }
}

/// A listing card that was matched but not turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedContainer {
    /// Position among all matched containers on the page.
    pub index: usize,
    pub reason: String,
}

/// Records pulled from one page plus any cards that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub records: Vec<ListingRecord>,
    pub skipped: Vec<SkippedContainer>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Compiled selectors for turning markup into listing records.
#[derive(Debug, Clone)]
pub struct Extractor {
    container: Selector,
    address: Selector,
    price: Selector,
    link: Selector,
    details: Selector,
}

impl Extractor {
    /// Compile `selectors`. An invalid selector is reported here so that
    /// extraction itself cannot fail.
    pub fn new(selectors: &ListingSelectors) -> Result<Self, ConfigError> {
        Ok(Self {
            container: compile("container", &selectors.container)?,
            address: compile("address", &selectors.address)?,
            price: compile("price", &selectors.price)?,
            link: compile("link", &selectors.link)?,
            details: compile("details", &selectors.details)?,
        })
    }

    /// Extractor for the stock listing card layout.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(&ListingSelectors::default())
    }

    /// Extract records in document order. Links are kept as written.
    pub fn extract(&self, markup: &str) -> Extraction {
        self.extract_with_base(markup, None)
    }

    /// Extract records, resolving relative listing links against `base`.
    pub fn extract_with_base(&self, markup: &str, base: Option<&Url>) -> Extraction {
        let document = Html::parse_document(markup);
        let containers: Vec<ElementRef<'_>> = document.select(&self.container).collect();
        let container_ids: HashSet<_> = containers.iter().map(|c| (**c).id()).collect();

        let mut extraction = Extraction::default();

        for (index, container) in containers.iter().enumerate() {
            // A card nested in another card would be read twice.
            if container
                .ancestors()
                .any(|ancestor| container_ids.contains(&ancestor.id()))
            {
                extraction.skipped.push(SkippedContainer {
                    index,
                    reason: "nested inside another listing container".to_string(),
                });
                continue;
            }

            extraction.records.push(self.read_card(*container, base));
        }

        debug!(
            "Extracted {} records ({} containers skipped)",
            extraction.records.len(),
            extraction.skipped.len()
        );
        extraction
    }

    fn read_card(&self, card: ElementRef<'_>, base: Option<&Url>) -> ListingRecord {
        let mut details = card.select(&self.details).map(normalized_text);

        ListingRecord::builder()
            .address(card.select(&self.address).next().and_then(normalized_text))
            .price(card.select(&self.price).next().and_then(normalized_text))
            .url(self.read_link(card, base))
            .bedrooms(details.next().flatten())
            .bathrooms(details.next().flatten())
            .square_footage(details.next().flatten())
            .build()
    }

    fn read_link(&self, card: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
        let href = card
            .select(&self.link)
            .find_map(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|h| !h.is_empty())?;

        match base.map(|b| b.join(href)) {
            Some(Ok(resolved)) => Some(resolved.to_string()),
            _ => Some(href.to_string()),
        }
    }
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

/// Element text with whitespace runs collapsed; `None` when blank.
fn normalized_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
