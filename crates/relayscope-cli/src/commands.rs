//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Relayscope: tell genuine OpenAI-compatible endpoints from relays
#[derive(Parser, Debug)]
#[command(name = "relayscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one detection cycle and print the verdict
    Detect(DetectArgs),

    /// Re-run detection every N minutes until interrupted
    Watch(WatchArgs),

    /// Serve the detector over a JSON HTTP API
    Serve(ServeArgs),
}

/// Endpoint and detector options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct EndpointArgs {
    /// Chat-completion URL to probe
    #[arg(long, env = "OPENAI_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bearer API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier sent with every probe
    #[arg(long)]
    pub model: Option<String>,

    /// Number of results to retain
    #[arg(long)]
    pub max_history: Option<usize>,

    /// YAML or JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not keep the last raw response body on results
    #[arg(long)]
    pub no_raw_response: bool,
}

/// Arguments for the detect command
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Endpoint options
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with failure when the verdict is "relay"
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Endpoint options
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Minutes between cycles
    #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub interval: u32,

    /// Run one cycle immediately instead of waiting a full interval
    #[arg(long)]
    pub now: bool,

    /// Print each result as a JSON line
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Endpoint options
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Start a cadence of N minutes on launch
    #[arg(short, long)]
    pub interval: Option<u32>,
}

/// Color choice argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
