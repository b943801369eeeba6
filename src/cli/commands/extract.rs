//! Extract command: run the extractor on saved markup.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use url::Url;

use fsbo::config::Config;
use fsbo::dataset::Dataset;
use fsbo::scrapers::Extractor;

use crate::cli::icons::{dim_arrow, info};

pub async fn cmd_extract(config: &Config, file: &Path, base_url: Option<&str>) -> anyhow::Result<()> {
    let markup = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let base = base_url
        .map(Url::parse)
        .transpose()
        .context("Invalid --base-url")?;

    let extractor = Extractor::new(&config.selectors).context("Invalid listing selectors")?;
    let extraction = extractor.extract_with_base(&markup, base.as_ref());

    eprintln!(
        "{} {} listings in {}",
        info(),
        extraction.records.len(),
        file.display()
    );
    for skipped in &extraction.skipped {
        eprintln!(
            "  {} skipped container #{}: {}",
            dim_arrow(),
            skipped.index,
            skipped.reason
        );
    }

    let csv = Dataset::new(extraction.records).to_csv()?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&csv)?;
    stdout.flush()?;

    Ok(())
}
