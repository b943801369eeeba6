//! End-to-end runs of the pipeline against a scripted fetcher.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use fsbo::config::ConfigError;
use fsbo::dataset::Dataset;
use fsbo::models::NOT_AVAILABLE;
use fsbo::pipeline::{
    CancellationFlag, MemorySink, Pipeline, PipelineError, PipelineEvent, PipelineOptions,
    PipelineState,
};
use fsbo::scrapers::{Extractor, FetchFailure, FetchResult, Fetcher, RetryPolicy, Throttle};

const TEMPLATE: &str = "https://listings.example.com/fsbo/?searchQueryState=abc";

/// Serves canned responses by page number and records every request.
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<u32, FetchResult>,
    requested: Mutex<Vec<String>>,
    cancel_on: Option<(u32, CancellationFlag)>,
}

impl ScriptedFetcher {
    fn with_page(mut self, page: u32, response: FetchResult) -> Self {
        self.pages.insert(page, response);
        self
    }

    fn cancel_on(mut self, page: u32, flag: CancellationFlag) -> Self {
        self.cancel_on = Some((page, flag));
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

fn page_number(url: &str) -> u32 {
    url.rsplit("&page=").next().unwrap().parse().unwrap()
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        self.requested.lock().unwrap().push(url.to_string());
        let page = page_number(url);

        if let Some((cancel_page, ref flag)) = self.cancel_on {
            if cancel_page == page {
                flag.cancel();
            }
        }

        self.pages
            .get(&page)
            .cloned()
            .unwrap_or_else(|| Ok("<html><body></body></html>".to_string()))
    }
}

fn card(address: &str, price: &str) -> String {
    format!(
        r#"<div class="list-card"><address>{}</address><div class="list-card-price">{}</div></div>"#,
        address, price
    )
}

fn run_pipeline(fetcher: Arc<ScriptedFetcher>, pages: u32, delay: Duration) -> Pipeline {
    Pipeline::new(
        PipelineOptions::new(TEMPLATE, pages),
        fetcher,
        Extractor::with_defaults().unwrap(),
        Throttle::new(delay, Duration::from_secs(10), RetryPolicy::default()),
    )
}

#[tokio::test(start_paused = true)]
async fn fetches_every_page_in_order() {
    for pages in [1u32, 2, 7, 20] {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let report = run_pipeline(fetcher.clone(), pages, Duration::ZERO)
            .run()
            .await
            .unwrap();

        let expected: Vec<String> = (1..=pages)
            .map(|n| format!("{}&page={}", TEMPLATE, n))
            .collect();
        assert_eq!(fetcher.requested(), expected);
        assert_eq!(report.pages_attempted(), pages as usize);
    }
}

#[tokio::test(start_paused = true)]
async fn single_listing_scenario() {
    let markup = r#"
        <div class="list-card">
          <address>123 Main St</address>
          <div class="list-card-price">$250,000</div>
          <a class="list-card-link" href="/p/1">Details</a>
          <ul class="list-card-details"><li>3 bd</li><li>2 ba</li><li>1500 sqft</li></ul>
        </div>
    "#;
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(1, Ok(markup.to_string())));

    let report = run_pipeline(fetcher, 1, Duration::from_secs(30))
        .run()
        .await
        .unwrap();

    assert_eq!(report.record_count(), 1);
    assert_eq!(
        report.dataset.records()[0].values(),
        ["123 Main St", "$250,000", "/p/1", "3 bd", "2 ba", "1500 sqft"]
    );
}

#[tokio::test(start_paused = true)]
async fn relative_links_resolved_when_enabled() {
    let markup = r#"<div class="list-card"><a class="list-card-link" href="/p/1">x</a></div>"#;
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(1, Ok(markup.to_string())));

    let report = Pipeline::new(
        PipelineOptions::new(TEMPLATE, 1).with_link_resolution(true),
        fetcher,
        Extractor::with_defaults().unwrap(),
        Throttle::new(Duration::ZERO, Duration::from_secs(10), RetryPolicy::default()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(
        report.dataset.records()[0].url(),
        "https://listings.example.com/p/1"
    );
}

#[tokio::test(start_paused = true)]
async fn failed_page_contributes_nothing_and_run_continues() {
    let page1 = format!("{}{}", card("1 A St", "$1"), card("2 A St", "$2"));
    let page3 = card("3 C St", "$3");
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_page(1, Ok(page1))
            .with_page(2, Err(FetchFailure::Transport("HTTP 503".to_string())))
            .with_page(3, Ok(page3)),
    );
    let sink = Arc::new(MemorySink::new());

    let mut pipeline =
        run_pipeline(fetcher.clone(), 3, Duration::from_secs(30)).with_sink(sink.clone());
    let report = pipeline.run().await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert_eq!(fetcher.requested().len(), 3);

    let tally = report.tally();
    assert_eq!(tally.succeeded, vec![1, 3]);
    assert_eq!(tally.failed, vec![2]);

    let addresses: Vec<_> = report.dataset.iter().map(|r| r.address()).collect();
    assert_eq!(addresses, vec!["1 A St", "2 A St", "3 C St"]);
    assert_eq!(
        report.dataset.len(),
        report
            .outcomes
            .iter()
            .filter(|o| o.succeeded)
            .map(|o| o.record_count())
            .sum::<usize>()
    );

    let failure = &report.outcomes[1];
    assert!(!failure.succeeded);
    assert!(failure.records.is_empty());
    assert!(failure.failure.as_deref().unwrap().contains("HTTP 503"));

    let events = sink.events();
    assert!(matches!(events.first(), Some(PipelineEvent::RunStarted { pages: 3, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::PageFailed { page_number: 2, .. }
    )));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::RunCompleted {
            records: 3,
            succeeded: 2,
            failed: 1
        })
    ));
    assert!(sink.is_flushed());
}

#[tokio::test(start_paused = true)]
async fn delay_follows_every_page() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let start = Instant::now();

    run_pipeline(fetcher, 3, Duration::from_secs(30))
        .run()
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(90));
}

#[tokio::test(start_paused = true)]
async fn invalid_page_count_aborts_before_fetching() {
    for pages in [0u32, 21] {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let mut pipeline = run_pipeline(fetcher.clone(), pages, Duration::ZERO);

        let result = pipeline.run().await;
        assert!(matches!(
            result,
            Err(PipelineError::Config(ConfigError::PageCount(_)))
        ));
        assert_eq!(pipeline.state(), PipelineState::Aborted);
        assert!(fetcher.requested().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn empty_template_aborts() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let mut pipeline = Pipeline::new(
        PipelineOptions::new("", 3),
        fetcher.clone(),
        Extractor::with_defaults().unwrap(),
        Throttle::new(Duration::ZERO, Duration::from_secs(10), RetryPolicy::default()),
    );

    assert!(matches!(
        pipeline.run().await,
        Err(PipelineError::Config(ConfigError::EmptyTemplate))
    ));
    assert!(fetcher.requested().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_between_pages() {
    let cancellation = CancellationFlag::new();
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with_page(2, Ok(card("2 B St", "$2")))
            .cancel_on(2, cancellation.clone()),
    );

    let report = run_pipeline(fetcher.clone(), 5, Duration::from_secs(30))
        .with_cancellation(cancellation)
        .run()
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(fetcher.requested().len(), 2);
    assert_eq!(report.pages_attempted(), 2);
    // The page in flight when cancellation arrived is kept.
    assert_eq!(report.record_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn retries_recover_a_flaky_page() {
    struct FlakyOnce {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl Fetcher for FlakyOnce {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch(&self, _url: &str) -> FetchResult {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                Err(FetchFailure::Transport("HTTP 429".to_string()))
            } else {
                Ok(card("9 R St", "$9"))
            }
        }
    }

    let report = Pipeline::new(
        PipelineOptions::new(TEMPLATE, 1),
        Arc::new(FlakyOnce { calls: Mutex::new(0) }),
        Extractor::with_defaults().unwrap(),
        Throttle::new(
            Duration::ZERO,
            Duration::from_secs(10),
            RetryPolicy::with_retries(1),
        ),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.outcomes[0].attempts, 2);
    assert!(report.outcomes[0].succeeded);
    assert_eq!(report.record_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn exported_csv_reads_back() {
    let markup = format!(
        "{}{}",
        card("10 Oak Ln, Charlotte, NC", "$410,000"),
        r#"<div class="list-card"><address>The "Loft"</address></div>"#
    );
    let fetcher = Arc::new(ScriptedFetcher::default().with_page(1, Ok(markup)));

    let report = run_pipeline(fetcher, 1, Duration::ZERO)
        .run()
        .await
        .unwrap();

    let csv = report.dataset.to_csv().unwrap();
    let restored = Dataset::from_csv(&csv).unwrap();
    assert_eq!(restored, report.dataset);
    assert_eq!(restored.records()[1].address(), r#"The "Loft""#);
    assert_eq!(restored.records()[1].price(), NOT_AVAILABLE);
}
