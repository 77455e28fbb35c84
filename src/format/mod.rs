//! Output formatting for `starbench`.
//!
//! - [`measurements`] - tab-separated measurements files, for downstream tools
//! - human-readable text summaries for the terminal
//!
//! JSON output is the serde rendering of [`crate::model::StatsSummary`].

pub mod measurements;
mod text;

pub use measurements::{load_measurements, parse_measurements, save_measurements, write_measurements};
pub use text::{format_duration, format_mean_line, format_summary};
