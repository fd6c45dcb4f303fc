//! `max_tokens` enforcement probe.

use super::{ApiTokenCounts, Evaluation, Probe, ProbeKind};
use crate::llm::{ChatRequest, ChatResponse};
use crate::result::ProbeError;
use crate::tokens;

/// Completion-token bound sent with the request.
pub const MAX_TOKENS_BOUND: u32 = 10;

/// Essay opener that invites a long answer.
pub const MAX_TOKENS_PROMPT: &str = "# The History, Present and Future of Artificial Intelligence\n\n\
Artificial Intelligence (AI)";

/// Asks for a long answer under a tiny `max_tokens` bound.
///
/// The endpoint's `usage.completion_tokens` is preferred; when the usage
/// block is missing, the returned text is counted locally instead. A relay
/// that drops `max_tokens`, or rewrites the completion, overshoots the bound.
///
/// A response with neither a completion count nor first-choice text is a
/// probe-logic error, not a pass: there is nothing to compare with the bound.
#[derive(Debug, Clone)]
pub struct MaxTokensProbe {
    bound: u32,
}

impl Default for MaxTokensProbe {
    fn default() -> Self {
        Self {
            bound: MAX_TOKENS_BOUND,
        }
    }
}

impl MaxTokensProbe {
    /// Probe with a custom bound.
    pub const fn with_bound(bound: u32) -> Self {
        Self { bound }
    }

    /// The configured bound.
    pub const fn bound(&self) -> u32 {
        self.bound
    }
}

impl Probe for MaxTokensProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::MaxTokens
    }

    fn request(&self, model: &str) -> ChatRequest {
        ChatRequest {
            max_tokens: Some(self.bound),
            ..ChatRequest::user_prompt(model, MAX_TOKENS_PROMPT)
        }
    }

    fn evaluate(&self, response: &ChatResponse) -> Result<Evaluation, ProbeError> {
        let usage = response.usage.unwrap_or_default();
        let api_tokens = ApiTokenCounts {
            completion_tokens: usage.completion_tokens.unwrap_or(0),
            total_tokens: usage.total_tokens.unwrap_or(0),
        };

        let (observed, source) = if let Some(reported) = usage.completion_tokens {
            (u64::from(reported), "usage")
        } else {
            let content = response
                .first_choice()
                .and_then(|c| c.content())
                .ok_or_else(|| {
                    ProbeError::malformed(
                        "response has neither usage.completion_tokens nor first-choice content",
                    )
                })?;
            let counted = tokens::count_tokens(content)
                .map_err(|e| ProbeError::malformed(format!("local token count failed: {e}")))?;
            (counted as u64, "local count")
        };

        let passed = observed <= u64::from(self.bound);
        Ok(Evaluation {
            passed,
            detail: format!(
                "bound={}, observed={observed} ({source}), total_tokens={}",
                self.bound, api_tokens.total_tokens
            ),
            api_tokens: Some(api_tokens),
        })
    }
}
