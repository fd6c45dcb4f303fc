//! Detection results and the reduction that produces them.
//!
//! A [`DetectionResult`] is assembled once, from the runs of one cycle, and
//! is never modified after it enters the history.

use crate::probe::{ProbeKind, ProbeRun};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator between probe errors in the summary.
pub const ERROR_SEPARATOR: &str = "; ";

/// Per-probe record kept on a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Which probe
    pub kind: ProbeKind,
    /// Whether the probe passed
    pub passed: bool,
    /// What was observed, when the check completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Why the check could not complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ProbeRun> for ProbeOutcome {
    fn from(run: &ProbeRun) -> Self {
        match &run.outcome {
            Ok(evaluation) => Self {
                kind: run.kind,
                passed: evaluation.passed,
                detail: Some(evaluation.detail.clone()),
                error: None,
            },
            Err(e) => Self {
                kind: run.kind,
                passed: false,
                detail: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Outcome of one detection cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Unique id of the cycle
    pub id: Uuid,
    /// When the cycle started
    pub timestamp: DateTime<Utc>,
    /// Endpoint probed (snapshot at cycle start)
    pub endpoint: String,
    /// Model probed (snapshot at cycle start)
    #[serde(default)]
    pub model: String,
    /// Overall verdict: all four probes passed
    pub is_real_api: bool,
    /// `max_tokens` was enforced
    pub max_tokens_ok: bool,
    /// `logprobs` were returned
    pub logprobs_ok: bool,
    /// `n` produced several choices
    pub multiple_ok: bool,
    /// `stop` marker absent from output
    pub stop_sequence_ok: bool,
    /// Probe errors joined by [`ERROR_SEPARATOR`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Body of the last response received in this cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// Local cl100k count of the max-tokens prompt, `-1` if unavailable
    pub local_token_count: i64,
    /// `usage.completion_tokens` from the max-tokens probe
    pub api_token_count: u32,
    /// `usage.total_tokens` from the max-tokens probe
    pub api_total_tokens: u32,
    /// Per-probe outcomes in execution order
    #[serde(default)]
    pub probes: Vec<ProbeOutcome>,
}

impl DetectionResult {
    /// Reduce a cycle's probe runs into a result.
    ///
    /// A probe kind with no run counts as not passed, so the verdict can
    /// only be `true` when every probe completed and passed.
    pub fn assemble(
        timestamp: DateTime<Utc>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        local_token_count: i64,
        runs: &[ProbeRun],
        keep_raw_response: bool,
    ) -> Self {
        let passed = |kind: ProbeKind| runs.iter().any(|r| r.kind == kind && r.passed());

        let max_tokens_ok = passed(ProbeKind::MaxTokens);
        let logprobs_ok = passed(ProbeKind::Logprobs);
        let multiple_ok = passed(ProbeKind::MultipleResponses);
        let stop_sequence_ok = passed(ProbeKind::StopSequence);

        let errors: Vec<String> = runs
            .iter()
            .filter_map(|r| {
                r.outcome
                    .as_ref()
                    .err()
                    .map(|e| format!("{} probe error: {e}", r.kind.label()))
            })
            .collect();

        let api_tokens = runs
            .iter()
            .find(|r| r.kind == ProbeKind::MaxTokens)
            .and_then(ProbeRun::api_tokens)
            .unwrap_or_default();

        let raw_response = if keep_raw_response {
            runs.iter().rev().find_map(|r| r.raw_body.clone())
        } else {
            None
        };

        Self {
            id: Uuid::new_v4(),
            timestamp,
            endpoint: endpoint.into(),
            model: model.into(),
            is_real_api: max_tokens_ok && logprobs_ok && multiple_ok && stop_sequence_ok,
            max_tokens_ok,
            logprobs_ok,
            multiple_ok,
            stop_sequence_ok,
            error: (!errors.is_empty()).then(|| errors.join(ERROR_SEPARATOR)),
            raw_response,
            local_token_count,
            api_token_count: api_tokens.completion_tokens,
            api_total_tokens: api_tokens.total_tokens,
            probes: runs.iter().map(ProbeOutcome::from).collect(),
        }
    }

    /// Short verdict label.
    pub const fn verdict_label(&self) -> &'static str {
        if self.is_real_api {
            "genuine"
        } else {
            "relay"
        }
    }

    /// Outcome for `kind`, if that probe ran.
    pub fn probe(&self, kind: ProbeKind) -> Option<&ProbeOutcome> {
        self.probes.iter().find(|p| p.kind == kind)
    }
}
