//! `logprobs` passthrough probe.

use super::{Evaluation, Probe, ProbeKind};
use crate::llm::{ChatRequest, ChatResponse};
use crate::result::ProbeError;

/// Short factual question; any answer will do.
pub const LOGPROBS_PROMPT: &str = "What is the capital of France?";

/// Alternatives requested per token position.
pub const TOP_LOGPROBS: u32 = 5;

/// Requests token log-probabilities. Relays frequently strip them or
/// cannot synthesize them, so the first choice must carry a `logprobs`
/// object (`null` or a missing key fails).
#[derive(Debug, Clone, Copy, Default)]
pub struct LogprobsProbe;

impl Probe for LogprobsProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Logprobs
    }

    fn request(&self, model: &str) -> ChatRequest {
        ChatRequest {
            logprobs: Some(true),
            top_logprobs: Some(TOP_LOGPROBS),
            ..ChatRequest::user_prompt(model, LOGPROBS_PROMPT)
        }
    }

    fn evaluate(&self, response: &ChatResponse) -> Result<Evaluation, ProbeError> {
        let choice = response
            .first_choice()
            .ok_or_else(|| ProbeError::malformed("unable to parse response format: no choices"))?;
        let present = choice.has_logprobs_object();
        Ok(Evaluation::new(
            present,
            format!("requested logprobs=true, response has logprobs={present}"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn evaluate(json: &str) -> Result<Evaluation, ProbeError> {
        LogprobsProbe.evaluate(&serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_request_fields() {
        let req = LogprobsProbe.request("m");
        assert_eq!(req.logprobs, Some(true));
        assert_eq!(req.top_logprobs, Some(5));
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn test_missing_key_fails() {
        let eval = evaluate(r#"{"choices":[{"message":{"content":"Paris"}}]}"#).unwrap();
        assert!(!eval.passed);
    }

    #[test]
    fn test_empty_object_passes() {
        let eval = evaluate(r#"{"choices":[{"message":{"content":"Paris"},"logprobs":{}}]}"#).unwrap();
        assert!(eval.passed);
    }

    #[test]
    fn test_null_fails() {
        let eval = evaluate(r#"{"choices":[{"message":{"content":"Paris"},"logprobs":null}]}"#).unwrap();
        assert!(!eval.passed);
    }

    #[test]
    fn test_non_object_fails() {
        let eval = evaluate(r#"{"choices":[{"logprobs":[1,2]}]}"#).unwrap();
        assert!(!eval.passed);
    }

    #[test]
    fn test_no_choices_is_error() {
        assert!(evaluate(r#"{"choices":[]}"#).is_err());
        assert!(evaluate(r#"{"object":"chat.completion"}"#).is_err());
    }
}
