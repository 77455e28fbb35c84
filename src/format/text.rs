//! Plain text rendering of benchmark results.

use crate::model::StatsSummary;
use std::fmt::Write;

/// Seconds with millisecond precision: `12.503 s`.
#[must_use]
pub fn format_duration(secs: f64) -> String {
    format!("{secs:.3} s")
}

/// The one-line result printed after a benchmark.
#[must_use]
pub fn format_mean_line(summary: &StatsSummary) -> String {
    let plural = if summary.num_runs == 1 { "" } else { "s" };
    format!(
        "duration : {} ({} run{plural})",
        format_duration(summary.mean),
        summary.num_runs
    )
}

/// Full summary, one statistic per line.
#[must_use]
pub fn format_summary(summary: &StatsSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "runs     : {}", summary.num_runs);
    let _ = writeln!(out, "mean     : {}", format_duration(summary.mean));
    let _ = writeln!(out, "median   : {}", format_duration(summary.median));
    let stddev = summary
        .stddev
        .map_or_else(|| "n/a".to_string(), format_duration);
    let _ = writeln!(out, "stddev   : {stddev}");
    let _ = write!(
        out,
        "range    : {} .. {}",
        format_duration(summary.min),
        format_duration(summary.max)
    );
    out
}
