//! Run diagnostics.
//!
//! The pipeline reports what happens on each page to a [`DiagnosticsSink`]
//! created once per run. The default sink writes to `tracing`.

use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::config::SearchFilters;

/// Events emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// Configuration accepted, first page about to be fetched
    RunStarted {
        pages: u32,
        fetcher: &'static str,
        filters: SearchFilters,
    },
    /// Page fetch started
    PageStarted { page_number: u32, url: String },
    /// Page fetched and extracted
    PageSucceeded {
        page_number: u32,
        records: usize,
        attempts: u32,
    },
    /// Page could not be fetched; it contributes no records
    PageFailed {
        page_number: u32,
        reason: String,
        attempts: u32,
    },
    /// A listing container on the page was not turned into a record
    ContainerSkipped {
        page_number: u32,
        index: usize,
        reason: String,
    },
    /// Cancellation observed; no further pages are fetched
    RunCancelled { pages_completed: u32 },
    /// Configuration rejected before any fetch
    RunAborted { reason: String },
    /// Run finished
    RunCompleted {
        records: usize,
        succeeded: usize,
        failed: usize,
    },
}

/// Receives run diagnostics.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: &PipelineEvent);

    /// Called once when the run ends.
    fn flush(&self) {}
}

/// Sink that logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted {
                pages,
                fetcher,
                filters,
            } => info!(
                "Starting run: {} pages with {} fetcher (filters: {})",
                pages, fetcher, filters
            ),
            PipelineEvent::PageStarted { page_number, url } => {
                info!("Fetching page {}: {}", page_number, url)
            }
            PipelineEvent::PageSucceeded {
                page_number,
                records,
                attempts,
            } => info!(
                "Page {}: {} listings ({} attempt{})",
                page_number,
                records,
                attempts,
                if *attempts == 1 { "" } else { "s" }
            ),
            PipelineEvent::PageFailed {
                page_number,
                reason,
                attempts,
            } => warn!(
                "Page {} failed after {} attempt(s): {}",
                page_number, attempts, reason
            ),
            PipelineEvent::ContainerSkipped {
                page_number,
                index,
                reason,
            } => debug!(
                "Page {}: skipped container #{}: {}",
                page_number, index, reason
            ),
            PipelineEvent::RunCancelled { pages_completed } => {
                warn!("Run cancelled after {} pages", pages_completed)
            }
            PipelineEvent::RunAborted { reason } => warn!("Run aborted: {}", reason),
            PipelineEvent::RunCompleted {
                records,
                succeeded,
                failed,
            } => info!(
                "Run complete: {} listings from {} pages ({} failed)",
                records, succeeded, failed
            ),
        }
    }
}

/// Sink that keeps events in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PipelineEvent>>,
    flushed: Mutex<bool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, in order.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_flushed(&self) -> bool {
        *self
            .flushed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, event: &PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }

    fn flush(&self) {
        *self
            .flushed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = true;
    }
}
