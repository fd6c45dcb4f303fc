//! Relayscope CLI Library
//!
//! Command-line interface and JSON HTTP API for the Relayscope detector.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{ColorArg, Cli, Commands, DetectArgs, EndpointArgs, ServeArgs, WatchArgs};
pub use config::{apply_overrides, resolve_detector_config, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{print_json, print_json_line, ProgressReporter};
