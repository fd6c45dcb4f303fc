//! `n` (multiple choices) probe.

use super::{Evaluation, Probe, ProbeKind};
use crate::llm::{ChatRequest, ChatResponse};
use crate::result::ProbeError;

/// Prompt with plenty of valid answers.
pub const MULTIPLE_PROMPT: &str = "Tell me a short joke";

/// Choices requested.
pub const REQUESTED_CHOICES: u32 = 3;

/// Requests several choices at high temperature. Some relays collapse `n`
/// to 1 regardless of the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipleResponsesProbe;

impl Probe for MultipleResponsesProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::MultipleResponses
    }

    fn request(&self, model: &str) -> ChatRequest {
        ChatRequest {
            n: Some(REQUESTED_CHOICES),
            temperature: Some(1.0),
            ..ChatRequest::user_prompt(model, MULTIPLE_PROMPT)
        }
    }

    fn evaluate(&self, response: &ChatResponse) -> Result<Evaluation, ProbeError> {
        let choices = response.choices.as_ref().ok_or_else(|| {
            ProbeError::malformed("unable to parse response format: missing choices")
        })?;
        let received = choices.len();
        Ok(Evaluation::new(
            received > 1,
            format!("requested n={REQUESTED_CHOICES}, received n={received}"),
        ))
    }
}
