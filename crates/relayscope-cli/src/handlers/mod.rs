//! Command handlers - extracted from main.rs for testability
//!
//! Each handler module contains the execution logic for one subcommand,
//! its pure helpers, and their tests.

pub mod detect;
pub mod serve;
pub mod watch;

pub use detect::{execute_detect, preflight, verdict_outcome};
pub use serve::{execute_serve, router, ApiError, ConfigView};
pub use watch::{execute_watch, PrintingRunner};
