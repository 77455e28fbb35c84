use clap::Parser;
use starbench::cli::commands::{self, CommandContext};
use starbench::cli::{Cli, Commands};
use starbench::logging::init_logging;
use starbench::{StarbenchError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let ctx = CommandContext::from_cli(&cli);

    let result = match &cli.command {
        Commands::Run(args) => commands::run::execute(args, &ctx),
        Commands::Cmake(args) => commands::cmake::execute(args, &ctx),
        Commands::Show(args) => commands::show::execute(args, &ctx),
        Commands::Version => commands::version::execute(&ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &StarbenchError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
