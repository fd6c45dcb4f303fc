//! `stop` sequence probe.

use super::{Evaluation, Probe, ProbeKind};
use crate::llm::{ChatRequest, ChatResponse};
use crate::result::{truncate, ProbeError};

/// Marker passed as the stop sequence.
pub const STOP_MARKER: &str = "THE_END";

/// Asks for a story that avoids the marker.
pub const STOP_PROMPT: &str = "Write a very short story. Do not include the word THE_END.";

/// Supplies a marker both as a `stop` sequence and as a word the prompt
/// forbids; the output must not contain it.
///
/// This is a weak signal. A model that simply obeys the instruction passes
/// even when the relay silently drops `stop`, so prompt compliance and
/// parameter enforcement are indistinguishable here.
#[derive(Debug, Clone)]
pub struct StopSequenceProbe {
    marker: String,
    prompt: String,
}

impl Default for StopSequenceProbe {
    fn default() -> Self {
        Self {
            marker: STOP_MARKER.to_string(),
            prompt: STOP_PROMPT.to_string(),
        }
    }
}

impl StopSequenceProbe {
    /// Probe with a custom marker; the prompt is rebuilt around it.
    pub fn with_marker(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        Self {
            prompt: format!("Write a very short story. Do not include the word {marker}."),
            marker,
        }
    }

    /// The marker checked for.
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Probe for StopSequenceProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::StopSequence
    }

    fn request(&self, model: &str) -> ChatRequest {
        ChatRequest {
            stop: Some(vec![self.marker.clone()]),
            ..ChatRequest::user_prompt(model, self.prompt.clone())
        }
    }

    fn evaluate(&self, response: &ChatResponse) -> Result<Evaluation, ProbeError> {
        let choice = response
            .first_choice()
            .ok_or_else(|| ProbeError::malformed("unable to parse response format: no choices"))?;
        let content = choice.content().ok_or_else(|| {
            ProbeError::malformed("unable to parse response format: first choice has no content")
        })?;
        let leaked = content.contains(&self.marker);
        Ok(Evaluation::new(
            !leaked,
            format!(
                "stop={}, marker in output={leaked}, preview={:?}",
                self.marker,
                truncate(content, 40)
            ),
        ))
    }
}
