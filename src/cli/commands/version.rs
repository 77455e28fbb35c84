//! Version command implementation.

use super::CommandContext;
use crate::error::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionOutput<'a> {
    name: &'a str,
    version: &'a str,
    build: &'a str,
}

fn build_kind() -> &'static str {
    if cfg!(debug_assertions) {
        "dev"
    } else {
        "release"
    }
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(ctx: &CommandContext) -> Result<()> {
    let output = VersionOutput {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        build: build_kind(),
    };

    if ctx.json {
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} version {} ({})", output.name, output.version, output.build);
    }
    Ok(())
}
