//! Summary of a completed run.

use chrono::{DateTime, Utc};

use crate::config::SearchFilters;
use crate::dataset::Dataset;
use crate::models::{PageOutcome, PageTally};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One outcome per attempted page, in page order.
    pub outcomes: Vec<PageOutcome>,
    pub dataset: Dataset,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// True when the run stopped early on request.
    pub cancelled: bool,
    /// Filters supplied for the run, echoed back as given.
    pub filters: SearchFilters,
}

impl RunReport {
    pub fn tally(&self) -> PageTally {
        PageTally::from_outcomes(&self.outcomes)
    }

    pub fn record_count(&self) -> usize {
        self.dataset.len()
    }

    pub fn pages_attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn failures(&self) -> impl Iterator<Item = &PageOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }
}
