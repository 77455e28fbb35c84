//! Tab-separated measurements files.
//!
//! ```text
//! run_id	duration
//! 0	12.503
//! 1	12.498
//! <average>	12.5005
//! ```
//!
//! Durations are in seconds. The trailing `<average>` row is informative only
//! and is ignored when loading.

use crate::error::{Result, ResultExt, StarbenchError};
use crate::model::{RunId, RunStats};
use crate::util::ensure_parent_dir;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Header row.
pub const HEADER: &str = "run_id\tduration";

/// First column of the summary row.
pub const AVERAGE_ROW: &str = "<average>";

/// Write the measurements of `stats`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_measurements<W: Write>(writer: &mut W, stats: &RunStats) -> io::Result<()> {
    writeln!(writer, "{HEADER}")?;
    for (run_id, duration) in stats.durations() {
        writeln!(writer, "{run_id}\t{duration}")?;
    }
    writeln!(writer, "{AVERAGE_ROW}\t{}", stats.mean())
}

/// Write the measurements of `stats` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_measurements(path: &Path, stats: &RunStats) -> Result<()> {
    ensure_parent_dir(path)
        .with_context(|| format!("Failed to create directory for {}", path.display()))?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_measurements(&mut writer, stats)?;
    writer.flush()?;
    Ok(())
}

/// Parse the content of a measurements file.
///
/// # Errors
///
/// Returns `StarbenchError::MeasurementsParse` (1-based line numbers) for a
/// malformed row, and `StarbenchError::EmptySample` if there is no run row.
pub fn parse_measurements(content: &str) -> Result<RunStats> {
    let mut durations: Vec<(RunId, f64)> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || (index == 0 && line.trim() == HEADER) {
            continue;
        }

        let parse_error = |reason: String| StarbenchError::MeasurementsParse {
            line: line_number,
            reason,
        };

        let (run_id, duration) = line
            .split_once('\t')
            .ok_or_else(|| parse_error("expected two tab-separated columns".to_string()))?;
        if run_id.trim() == AVERAGE_ROW {
            continue;
        }

        let run_id: RunId = run_id
            .trim()
            .parse()
            .map_err(|e| parse_error(format!("invalid run id '{run_id}': {e}")))?;
        let duration: f64 = duration
            .trim()
            .parse()
            .map_err(|e| parse_error(format!("invalid duration '{duration}': {e}")))?;
        if !duration.is_finite() || duration < 0.0 {
            return Err(parse_error(format!("duration out of range: {duration}")));
        }
        durations.push((run_id, duration));
    }

    RunStats::from_durations(durations)
}

/// Load a measurements file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_measurements(path: &Path) -> Result<RunStats> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_measurements(&content)
}
