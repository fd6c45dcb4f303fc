//! CLI configuration
//!
//! Detector settings are layered, lowest precedence first: built-in
//! defaults, the `--config` file, the `OPENAI_*` environment variables,
//! then command-line flags. Clap folds the environment into the flag
//! values, so the last two layers arrive together in [`EndpointArgs`].

use crate::commands::EndpointArgs;
use crate::error::{CliError, CliResult};
use relayscope::DetectorConfig;
use serde::{Deserialize, Serialize};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Derive from `-q` and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Default log filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn,relayscope=info",
            Self::Verbose => "info,relayscope=debug",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// JSON log lines
    pub log_json: bool,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set JSON logging
    #[must_use]
    pub const fn with_log_json(mut self, log_json: bool) -> Self {
        self.log_json = log_json;
        self
    }
}

/// Apply flag and environment values on top of `base`.
#[must_use]
pub fn apply_overrides(mut base: DetectorConfig, args: &EndpointArgs) -> DetectorConfig {
    if let Some(endpoint) = &args.endpoint {
        base.endpoint.clone_from(endpoint);
    }
    if let Some(key) = &args.api_key {
        base.api_key.clone_from(key);
    }
    if let Some(model) = &args.model {
        base.model.clone_from(model);
    }
    if let Some(max_history) = args.max_history {
        base.max_history = max_history;
    }
    if args.no_raw_response {
        base.save_raw_response = false;
    }
    base.normalized()
}

/// Build and validate the detector configuration for a subcommand.
pub fn resolve_detector_config(args: &EndpointArgs) -> CliResult<DetectorConfig> {
    let base = match &args.config {
        Some(path) => DetectorConfig::from_file(path).map_err(|e| {
            CliError::config(format!("failed to load {}: {e}", path.display()))
        })?,
        None => DetectorConfig::default(),
    };
    let config = apply_overrides(base, args);
    config.validate()?;
    Ok(config)
}
