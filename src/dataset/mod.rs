//! Run dataset assembly.

mod export;

use serde::Serialize;

use crate::models::{ListingRecord, PageOutcome};

pub use export::{ExportError, ExportFormat};

/// All records of a run, in page order then extraction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<ListingRecord>,
}

impl Dataset {
    pub fn new(records: Vec<ListingRecord>) -> Self {
        Self { records }
    }

    /// Concatenate the records of every outcome in page order.
    pub fn from_outcomes(outcomes: &[PageOutcome]) -> Self {
        let mut aggregator = Aggregator::new();
        for outcome in outcomes {
            aggregator.add_page(outcome);
        }
        aggregator.finish()
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListingRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<ListingRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a ListingRecord;
    type IntoIter = std::slice::Iter<'a, ListingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Collects per-page batches as a run progresses.
///
/// Batches may arrive in any order; [`finish`](Self::finish) lays them out by
/// page number. Failed pages contribute nothing.
#[derive(Debug, Default)]
pub struct Aggregator {
    batches: Vec<(u32, Vec<ListingRecord>)>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, outcome: &PageOutcome) {
        if outcome.succeeded {
            self.batches
                .push((outcome.page_number, outcome.records.clone()));
        }
    }

    /// Records collected so far.
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|(_, batch)| batch.len()).sum()
    }

    pub fn finish(mut self) -> Dataset {
        // Stable, so repeated page numbers keep arrival order.
        self.batches.sort_by_key(|(page, _)| *page);
        Dataset::new(
            self.batches
                .into_iter()
                .flat_map(|(_, batch)| batch)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str) -> ListingRecord {
        ListingRecord::builder()
            .address(Some(address.to_string()))
            .build()
    }

    fn success(page: u32, addresses: &[&str]) -> PageOutcome {
        PageOutcome::success(
            page,
            format!("t&page={}", page),
            addresses.iter().map(|a| record(a)).collect(),
            1,
        )
    }

    #[test]
    fn test_pages_concatenated_in_order() {
        let outcomes = vec![
            success(1, &["a", "b"]),
            PageOutcome::failure(2, "t&page=2".to_string(), "HTTP 500".to_string(), 1),
            success(3, &["c"]),
        ];
        let dataset = Dataset::from_outcomes(&outcomes);

        let addresses: Vec<_> = dataset.iter().map(|r| r.address()).collect();
        assert_eq!(addresses, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_aggregator_orders_by_page() {
        let mut aggregator = Aggregator::new();
        aggregator.add_page(&success(2, &["second"]));
        aggregator.add_page(&success(1, &["first"]));
        assert_eq!(aggregator.record_count(), 2);

        let dataset = aggregator.finish();
        assert_eq!(dataset.records()[0].address(), "first");
        assert_eq!(dataset.records()[1].address(), "second");
    }

    #[test]
    fn test_empty_run_gives_empty_dataset() {
        assert!(Dataset::from_outcomes(&[]).is_empty());
    }
}
