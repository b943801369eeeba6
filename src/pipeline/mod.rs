//! Run orchestration.
//!
//! A [`Pipeline`] walks result pages `1..=n` strictly in order. Each page is
//! fetched through the [`Throttle`], extracted, and recorded as a
//! [`PageOutcome`]. A failed page is logged and skipped; it never ends the run.
//! The fixed delay follows every page, the last one included.

mod diagnostics;
mod report;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Notify;
use url::Url;

use crate::config::{validate_page_count, Config, ConfigError, SearchFilters};
use crate::dataset::Aggregator;
use crate::models::{PageOutcome, PageTally};
use crate::scrapers::{Extractor, Fetcher, Throttle};

pub use diagnostics::{DiagnosticsSink, MemorySink, PipelineEvent, TracingSink};
pub use report::RunReport;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("pipeline has already run")]
    AlreadyStarted,
}

/// Where a pipeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running { page: u32 },
    Completed,
    Aborted,
}

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub page_count: u32,
    /// Search URL; `&page=<n>` is appended for each page.
    pub url_template: String,
    pub filters: SearchFilters,
    /// Join relative listing links onto the page URL instead of exporting
    /// the raw `href`.
    pub resolve_links: bool,
}

impl PipelineOptions {
    pub fn new(url_template: impl Into<String>, page_count: u32) -> Self {
        Self {
            page_count,
            url_template: url_template.into(),
            filters: SearchFilters::default(),
            resolve_links: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            page_count: config.pages,
            url_template: config.url_template.clone().unwrap_or_default(),
            filters: config.filters.clone(),
            resolve_links: config.resolve_links,
        }
    }

    pub fn with_link_resolution(mut self, resolve_links: bool) -> Self {
        self.resolve_links = resolve_links;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_page_count(self.page_count)?;
        if self.url_template.trim().is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }
        Ok(())
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}&page={}", self.url_template, page)
    }
}

/// Cooperative cancellation shared between a run and whoever wants it stopped.
///
/// The run checks the flag before each page and stops waiting out the
/// inter-page delay as soon as it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Sequential fetch → extract → aggregate driver for one run.
pub struct Pipeline {
    options: PipelineOptions,
    fetcher: Arc<dyn Fetcher>,
    extractor: Extractor,
    throttle: Throttle,
    sink: Arc<dyn DiagnosticsSink>,
    cancellation: CancellationFlag,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        fetcher: Arc<dyn Fetcher>,
        extractor: Extractor,
        throttle: Throttle,
    ) -> Self {
        Self {
            options,
            fetcher,
            extractor,
            throttle,
            sink: Arc::new(TracingSink),
            cancellation: CancellationFlag::new(),
            state: PipelineState::Idle,
        }
    }

    /// Report diagnostics to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run every page and build the dataset.
    ///
    /// Fails only when the options are invalid (nothing is fetched then) or
    /// the pipeline was already run. Page failures end up in the report.
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::AlreadyStarted);
        }

        if let Err(e) = self.options.validate().and_then(|_| self.throttle.validate()) {
            self.state = PipelineState::Aborted;
            self.sink.record(&PipelineEvent::RunAborted {
                reason: e.to_string(),
            });
            self.sink.flush();
            return Err(e.into());
        }

        let started_at = Utc::now();
        self.sink.record(&PipelineEvent::RunStarted {
            pages: self.options.page_count,
            fetcher: self.fetcher.name(),
            filters: self.options.filters.clone(),
        });

        let mut aggregator = Aggregator::new();
        let mut outcomes: Vec<PageOutcome> = Vec::new();
        let mut cancelled = false;

        for page in 1..=self.options.page_count {
            if self.cancellation.is_cancelled() {
                cancelled = true;
                self.sink.record(&PipelineEvent::RunCancelled {
                    pages_completed: page - 1,
                });
                break;
            }

            self.state = PipelineState::Running { page };
            let outcome = self.process_page(page).await;
            aggregator.add_page(&outcome);
            outcomes.push(outcome);

            tokio::select! {
                _ = self.throttle.pause() => {}
                _ = self.cancellation.cancelled() => {}
            }
        }

        let dataset = aggregator.finish();
        let tally = PageTally::from_outcomes(&outcomes);
        self.sink.record(&PipelineEvent::RunCompleted {
            records: dataset.len(),
            succeeded: tally.succeeded.len(),
            failed: tally.failed.len(),
        });
        self.sink.flush();
        self.state = PipelineState::Completed;

        Ok(RunReport {
            outcomes,
            dataset,
            started_at,
            finished_at: Utc::now(),
            cancelled,
            filters: self.options.filters.clone(),
        })
    }

    async fn process_page(&self, page: u32) -> PageOutcome {
        let url = self.options.page_url(page);
        self.sink.record(&PipelineEvent::PageStarted {
            page_number: page,
            url: url.clone(),
        });

        let fetched = self.throttle.fetch(self.fetcher.as_ref(), &url).await;

        match fetched.result {
            Ok(markup) => {
                let base = if self.options.resolve_links {
                    Url::parse(&url).ok()
                } else {
                    None
                };
                let extraction = self.extractor.extract_with_base(&markup, base.as_ref());

                for skipped in &extraction.skipped {
                    self.sink.record(&PipelineEvent::ContainerSkipped {
                        page_number: page,
                        index: skipped.index,
                        reason: skipped.reason.clone(),
                    });
                }
                self.sink.record(&PipelineEvent::PageSucceeded {
                    page_number: page,
                    records: extraction.records.len(),
                    attempts: fetched.attempts,
                });

                PageOutcome::success(page, url, extraction.records, fetched.attempts)
            }
            Err(failure) => {
                let reason = failure.to_string();
                self.sink.record(&PipelineEvent::PageFailed {
                    page_number: page,
                    reason: reason.clone(),
                    attempts: fetched.attempts,
                });
                PageOutcome::failure(page, url, reason, fetched.attempts)
            }
        }
    }
}
