//! `starbench show`: summarize a measurements file.

use super::CommandContext;
use crate::cli::ShowArgs;
use crate::error::Result;
use crate::format::{format_mean_line, format_summary, load_measurements};

/// Execute the show command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn execute(args: &ShowArgs, ctx: &CommandContext) -> Result<()> {
    let summary = load_measurements(&args.path)?.summary();
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", format_mean_line(&summary));
        println!("{}", format_summary(&summary));
    }
    Ok(())
}
