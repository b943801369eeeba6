//! fsbo - paginated real-estate listing acquisition.
//!
//! Fetches search result pages one at a time (plain HTTP or headless Chrome),
//! extracts listing cards into uniform records and exports them as CSV or JSON.

pub mod config;
pub mod dataset;
pub mod models;
pub mod pipeline;
pub mod scrapers;
