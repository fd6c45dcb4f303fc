//! Probe suite: heuristic checks for parameter-honoring behavior.
//!
//! Each probe builds one request, the shared [`ChatClient`] sends it, and the
//! probe evaluates the decoded response. Two failure modes are kept apart:
//!
//! - `Ok(Evaluation { passed: false, .. })`: the check ran and the endpoint
//!   did not honor the parameter
//! - `Err(ProbeError)`: the check could not be completed at all
//!
//! Either way the probe counts as not passed in the verdict.

mod logprobs;
mod max_tokens;
mod multiple;
mod stop_sequence;

pub use logprobs::{LogprobsProbe, LOGPROBS_PROMPT, TOP_LOGPROBS};
pub use max_tokens::{MaxTokensProbe, MAX_TOKENS_BOUND, MAX_TOKENS_PROMPT};
pub use multiple::{MultipleResponsesProbe, MULTIPLE_PROMPT, REQUESTED_CHOICES};
pub use stop_sequence::{StopSequenceProbe, STOP_MARKER, STOP_PROMPT};

use crate::llm::{ChatClient, ChatRequest, ChatResponse, Endpoint};
use crate::result::ProbeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identity of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// `max_tokens` bound is enforced
    MaxTokens,
    /// `logprobs` data is returned
    Logprobs,
    /// `n` yields several choices
    MultipleResponses,
    /// `stop` marker is absent from the output
    StopSequence,
}

impl ProbeKind {
    /// All probes in execution order.
    pub const ALL: [Self; 4] = [
        Self::MaxTokens,
        Self::Logprobs,
        Self::MultipleResponses,
        Self::StopSequence,
    ];

    /// Machine-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::MaxTokens => "max_tokens",
            Self::Logprobs => "logprobs",
            Self::MultipleResponses => "multiple_responses",
            Self::StopSequence => "stop_sequence",
        }
    }

    /// Human-readable label used in error summaries and reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::MaxTokens => "Max tokens",
            Self::Logprobs => "Logprobs",
            Self::MultipleResponses => "Multiple responses",
            Self::StopSequence => "Stop sequence",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Token figures reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTokenCounts {
    /// `usage.completion_tokens`, 0 when absent
    pub completion_tokens: u32,
    /// `usage.total_tokens`, 0 when absent
    pub total_tokens: u32,
}

/// Evidence from a probe whose check completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the endpoint honored the parameter
    pub passed: bool,
    /// What was requested versus what was observed
    pub detail: String,
    /// Token figures, for probes that read the usage block
    pub api_tokens: Option<ApiTokenCounts>,
}

impl Evaluation {
    /// Evaluation without token figures.
    pub fn new(passed: bool, detail: impl Into<String>) -> Self {
        Self {
            passed,
            detail: detail.into(),
            api_tokens: None,
        }
    }
}

/// A single heuristic check against the endpoint.
pub trait Probe: fmt::Debug + Send + Sync {
    /// Which probe this is.
    fn kind(&self) -> ProbeKind;

    /// The request to send for `model`.
    fn request(&self, model: &str) -> ChatRequest;

    /// Judge a decoded response.
    fn evaluate(&self, response: &ChatResponse) -> Result<Evaluation, ProbeError>;
}

/// The four probes in their fixed execution order.
pub fn default_suite() -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(MaxTokensProbe::default()),
        Box::new(LogprobsProbe),
        Box::new(MultipleResponsesProbe),
        Box::new(StopSequenceProbe::default()),
    ]
}

/// Outcome of executing one probe once.
#[derive(Debug)]
pub struct ProbeRun {
    /// Which probe ran
    pub kind: ProbeKind,
    /// Evaluation, or why the check could not complete
    pub outcome: Result<Evaluation, ProbeError>,
    /// Response body as received, when a 2xx response arrived
    pub raw_body: Option<String>,
    /// Request latency, when a 2xx response arrived
    pub latency: Option<Duration>,
}

impl ProbeRun {
    /// A run that failed before any response was available.
    pub fn failed(kind: ProbeKind, error: ProbeError) -> Self {
        Self {
            kind,
            outcome: Err(error),
            raw_body: None,
            latency: None,
        }
    }

    /// `true` only if the check completed and passed.
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(evaluation) if evaluation.passed)
    }

    /// Token figures, if the probe produced any.
    pub fn api_tokens(&self) -> Option<ApiTokenCounts> {
        self.outcome.as_ref().ok().and_then(|e| e.api_tokens)
    }
}

/// Send `probe`'s request to `endpoint` and evaluate the answer.
pub async fn run_probe(
    probe: &dyn Probe,
    client: &ChatClient,
    endpoint: &Endpoint,
    model: &str,
) -> ProbeRun {
    let kind = probe.kind();
    let request = probe.request(model);

    let run = match client.send(endpoint, &request).await {
        Ok(timed) => ProbeRun {
            kind,
            outcome: probe.evaluate(&timed.response),
            raw_body: Some(timed.raw_body),
            latency: Some(timed.latency),
        },
        Err(e) => ProbeRun::failed(kind, e),
    };

    match &run.outcome {
        Ok(evaluation) => tracing::info!(
            probe = kind.name(),
            passed = evaluation.passed,
            latency_ms = run.latency.map_or(0, |l| l.as_millis() as u64),
            "{}",
            evaluation.detail
        ),
        Err(e) => tracing::warn!(probe = kind.name(), error = %e, "probe could not complete"),
    }

    run
}
