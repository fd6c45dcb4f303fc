//! Relayscope: tell genuine OpenAI-compatible endpoints from relays
//!
//! Relays that sit in front of a model provider often accept the standard
//! request parameters and then quietly drop them. Relayscope sends a small
//! battery of requests whose answers reveal whether `max_tokens`,
//! `logprobs`, `n` and `stop` were honored, and reduces the evidence to a
//! single verdict.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    RELAYSCOPE Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scheduler  │    │ Detector   │    │ Probes     │  HTTP      │
//! │   │ (cadence)  │───►│ (cycle)    │───►│ x4         │──────► API │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                           ▼                                      │
//! │                     ┌────────────┐                               │
//! │                     │ History    │◄─── Monitor (front-ends)      │
//! │                     └────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A verdict is a deterministic function of one unreplicated sample of
//! responses. It carries no statistical confidence.

#![warn(missing_docs)]

/// Detector configuration
pub mod config;
/// Verdict aggregator: one detection cycle
pub mod detector;
/// Bounded result history
pub mod history;
/// OpenAI-compatible wire types and client
pub mod llm;
/// Downstream facade
pub mod monitor;
/// Heuristic probes
pub mod probe;
/// JSON, Markdown and text rendering of results
pub mod report;
mod result;
/// Cadence management
pub mod scheduler;
/// Reference token counter
pub mod tokens;
/// Detection result record
pub mod verdict;

pub use config::{DetectorConfig, API_KEY_ENV, DEFAULT_MAX_HISTORY, DEFAULT_MODEL, ENDPOINT_ENV};
pub use detector::{DetectionStatus, Detector};
pub use history::History;
pub use llm::{ChatClient, Endpoint};
pub use monitor::{LatestView, Monitor};
pub use probe::{default_suite, Probe, ProbeKind, ProbeRun};
pub use result::{
    truncate, truncate_body, ProbeError, RelayscopeError, RelayscopeResult, BODY_PREVIEW_LIMIT,
};
pub use scheduler::{CadenceState, CycleRunner, Scheduler};
pub use tokens::{count_tokens, count_tokens_or_sentinel};
pub use verdict::{DetectionResult, ProbeOutcome};
