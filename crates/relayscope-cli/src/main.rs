//! Relayscope CLI: detect relays in front of OpenAI-compatible endpoints
//!
//! ## Usage
//!
//! ```bash
//! relayscope detect --endpoint https://api.example/v1/chat/completions
//! relayscope detect --json --strict          # exit 1 on a relay verdict
//! relayscope watch --interval 10             # re-run every 10 minutes
//! relayscope serve --port 8080               # JSON HTTP API
//! ```

use clap::Parser;
use relayscope_cli::{handlers, logging, Cli, CliConfig, CliError, CliResult, Commands, Verbosity};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init(&config)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::server(format!("Failed to create async runtime: {e}")))?;

    match &cli.command {
        Commands::Detect(args) => rt.block_on(handlers::execute_detect(&config, args)),
        Commands::Watch(args) => rt.block_on(handlers::execute_watch(&config, args)),
        Commands::Serve(args) => rt.block_on(handlers::execute_serve(&config, args)),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.clone().into())
        .with_log_json(cli.log_json)
}
