//! Progress bar for a scrape run.

use indicatif::{ProgressBar, ProgressStyle};

use fsbo::pipeline::{DiagnosticsSink, PipelineEvent, TracingSink};

/// Diagnostics sink that drives a per-page progress bar and still logs every
/// event through `tracing`.
pub struct ProgressSink {
    bar: ProgressBar,
    tracing: TracingSink,
}

impl ProgressSink {
    pub fn new(pages: u32) -> Self {
        let bar = ProgressBar::new(u64::from(pages));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self {
            bar,
            tracing: TracingSink,
        }
    }
}

impl DiagnosticsSink for ProgressSink {
    fn record(&self, event: &PipelineEvent) {
        // Keep log lines from tearing the bar
        self.bar.suspend(|| self.tracing.record(event));

        match event {
            PipelineEvent::PageStarted { page_number, .. } => {
                self.bar.set_message(format!("fetching page {}", page_number));
            }
            PipelineEvent::PageSucceeded { records, .. } => {
                self.bar.set_message(format!("{} listings", records));
                self.bar.inc(1);
            }
            PipelineEvent::PageFailed { page_number, .. } => {
                self.bar.set_message(format!("page {} failed", page_number));
                self.bar.inc(1);
            }
            PipelineEvent::RunCancelled { .. } => {
                self.bar.abandon_with_message("cancelled");
            }
            _ => {}
        }
    }

    fn flush(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
