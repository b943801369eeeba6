//! Per-page fetch and outcome types.

use serde::Serialize;

use super::listing::ListingRecord;

/// A single fetch attempt for one results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub page_url: String,
    /// 1-based attempt number.
    pub attempt: u32,
}

impl FetchRequest {
    pub fn first(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            attempt: 1,
        }
    }

    /// The request for the following attempt at the same page.
    pub fn next_attempt(&self) -> Self {
        Self {
            page_url: self.page_url.clone(),
            attempt: self.attempt + 1,
        }
    }
}

/// Result of one fetch + extract cycle for a page.
#[derive(Debug, Clone, Serialize)]
pub struct PageOutcome {
    pub page_number: u32,
    pub page_url: String,
    pub records: Vec<ListingRecord>,
    pub succeeded: bool,
    /// Failure reason when `succeeded` is false.
    pub failure: Option<String>,
    /// Fetch attempts made for this page.
    pub attempts: u32,
}

impl PageOutcome {
    pub fn success(
        page_number: u32,
        page_url: String,
        records: Vec<ListingRecord>,
        attempts: u32,
    ) -> Self {
        Self {
            page_number,
            page_url,
            records,
            succeeded: true,
            failure: None,
            attempts,
        }
    }

    pub fn failure(page_number: u32, page_url: String, reason: String, attempts: u32) -> Self {
        Self {
            page_number,
            page_url,
            records: Vec::new(),
            succeeded: false,
            failure: Some(reason),
            attempts,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Success/failure tally over a run, by page number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageTally {
    pub succeeded: Vec<u32>,
    pub failed: Vec<u32>,
}

impl PageTally {
    pub fn from_outcomes(outcomes: &[PageOutcome]) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            if outcome.succeeded {
                tally.succeeded.push(outcome.page_number);
            } else {
                tally.failed.push(outcome.page_number);
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
