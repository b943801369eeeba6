//! Scrape command: run the pipeline and export the dataset.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use fsbo::config::{parse_page_count, Config, SearchFilters};
use fsbo::dataset::ExportFormat;
use fsbo::pipeline::{CancellationFlag, Pipeline, PipelineOptions, RunReport};
use fsbo::scrapers::{build_fetcher, Extractor, FetcherKind, RetryPolicy, Throttle};

use crate::cli::helpers::print_preview;
use crate::cli::icons::{dim_arrow, error, info, success, warn};
use crate::cli::progress::ProgressSink;

/// Rows shown in the preview table.
const PREVIEW_ROWS: usize = 5;

/// Flags for `fsbo scrape`. Anything set here overrides the config file.
#[derive(clap::Args, Debug, Default)]
pub struct ScrapeArgs {
    /// Number of result pages to fetch (1-20)
    #[arg(short, long)]
    pub pages: Option<String>,
    /// Search URL template; `&page=<n>` is appended per page
    #[arg(short, long)]
    pub template: Option<String>,
    /// Fetch backend
    #[arg(long, value_enum)]
    pub fetcher: Option<FetcherKind>,
    /// Seconds to wait after each page
    #[arg(long)]
    pub delay: Option<u64>,
    /// Request timeout in seconds (static fetcher)
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Retry failed pages this many times
    #[arg(long)]
    pub retries: Option<u32>,
    /// Price range filter, e.g. "200000,500000"
    #[arg(long)]
    pub price: Option<String>,
    /// Square footage range filter, e.g. "1500,3000"
    #[arg(long)]
    pub sqft: Option<String>,
    /// Bedroom range filter, e.g. "3,5"
    #[arg(long)]
    pub beds: Option<String>,
    /// Export file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Export format (defaults to the output file extension)
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,
    /// Export absolute listing links instead of the raw href
    #[arg(long)]
    pub resolve_links: bool,
}

impl ScrapeArgs {
    /// Layer the flags onto `config`.
    pub fn apply_to(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(ref raw) = self.pages {
            config.pages = parse_page_count(raw)?;
        }
        if let Some(ref template) = self.template {
            config.url_template = Some(template.clone());
        }
        if let Some(fetcher) = self.fetcher {
            config.fetcher = fetcher;
        }
        if let Some(delay) = self.delay {
            config.request_delay_secs = delay;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.retry = RetryPolicy {
                max_retries: retries,
                ..config.retry.clone()
            };
        }
        if let Some(ref output) = self.output {
            config.output = Some(output.display().to_string());
        }
        if self.resolve_links {
            config.resolve_links = true;
        }
        config.filters.merge(SearchFilters {
            price: self.price.clone(),
            sqft: self.sqft.clone(),
            beds: self.beds.clone(),
        });
        Ok(())
    }
}

pub async fn cmd_scrape(mut config: Config, args: &ScrapeArgs) -> anyhow::Result<()> {
    args.apply_to(&mut config)?;

    let output_path = config.output_path();
    let format = args
        .format
        .unwrap_or_else(|| ExportFormat::from_path(&output_path));

    let extractor = Extractor::new(&config.selectors).context("Invalid listing selectors")?;
    let throttle = Throttle::from_config(&config)?;
    let fetcher = build_fetcher(&config).context("Failed to set up fetcher")?;
    let options = PipelineOptions::from_config(&config);

    println!(
        "{} Scraping {} pages with the {} fetcher ({}s between pages)",
        info(),
        options.page_count,
        config.fetcher,
        config.request_delay_secs
    );
    if !options.filters.is_empty() {
        println!("  {} Filters: {}", dim_arrow(), options.filters);
    }

    let cancellation = CancellationFlag::new();
    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, cancellation).await {
                std::process::exit(130);
            }
        });
    }

    let progress = Arc::new(ProgressSink::new(options.page_count));
    let mut pipeline = Pipeline::new(options, fetcher, extractor, throttle)
        .with_sink(progress)
        .with_cancellation(cancellation);

    let report = pipeline.run().await.context("Scrape aborted")?;

    print_summary(&report);

    if report.dataset.is_empty() {
        println!(
            "{} No data was scraped. Please check the network or the URL structure.",
            warn()
        );
        return Ok(());
    }

    print_preview(&report.dataset, PREVIEW_ROWS);

    let bytes = report.dataset.export(format)?;
    tokio::fs::write(&output_path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!(
        "{} Saved {} listings to {} ({})",
        success(),
        report.record_count(),
        output_path.display(),
        format
    );

    Ok(())
}

/// First interrupt stops the run after the current page. Returns `true` when
/// a second one arrives, meaning the caller should exit immediately.
async fn watch_interrupts<S, F>(mut next_signal: S, cancellation: CancellationFlag) -> bool
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    eprintln!(
        "\n{} Stopping after the current page (Ctrl-C again to quit now)...",
        warn()
    );
    cancellation.cancel();

    if next_signal().await.is_err() {
        return false;
    }
    eprintln!("\n{} Interrupted", error());
    true
}

fn print_summary(report: &RunReport) {
    let tally = report.tally();

    println!(
        "{} {} listings from {}/{} pages in {}s",
        if tally.failed.is_empty() {
            success()
        } else {
            warn()
        },
        report.record_count(),
        tally.succeeded.len(),
        tally.total(),
        report.duration().num_seconds()
    );

    for outcome in report.failures() {
        println!(
            "  {} page {}: {}",
            error(),
            outcome.page_number,
            outcome.failure.as_deref().unwrap_or("unknown error")
        );
    }

    if report.cancelled {
        println!("  {} Run cancelled before all pages were fetched", warn());
    }
}
