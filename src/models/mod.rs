//! Data models for listing acquisition.

mod listing;
mod page;

pub use listing::{ListingRecord, ListingRecordBuilder, COLUMNS, NOT_AVAILABLE};
pub use page::{FetchRequest, PageOutcome, PageTally};
