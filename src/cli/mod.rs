//! Command-line interface for fsbo.

mod commands;
pub mod helpers;
pub mod icons;
pub mod progress;

pub use commands::{is_verbose, run};
