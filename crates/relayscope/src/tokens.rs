//! Reference token counter.
//!
//! Counts tokens with the cl100k_base BPE. The count is a comparison
//! baseline only; the endpoint's own `usage` block is the primary evidence.

use crate::result::{RelayscopeError, RelayscopeResult};
use std::sync::OnceLock;
use tiktoken_rs::CoreBPE;

static CL100K: OnceLock<Result<CoreBPE, String>> = OnceLock::new();

fn encoder() -> RelayscopeResult<&'static CoreBPE> {
    CL100K
        .get_or_init(|| tiktoken_rs::cl100k_base().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| RelayscopeError::tokenizer(format!("failed to load cl100k_base: {e}")))
}

/// Number of tokens in `text` under cl100k_base.
pub fn count_tokens(text: &str) -> RelayscopeResult<usize> {
    Ok(encoder()?.encode_with_special_tokens(text).len())
}

/// Token count as a signed value, `-1` when the tokenizer is unavailable.
pub fn count_tokens_or_sentinel(text: &str) -> i64 {
    match count_tokens(text) {
        Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
        Err(e) => {
            tracing::warn!(error = %e, "local token count unavailable");
            -1
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_has_no_tokens() {
        assert_eq!(count_tokens("").unwrap(), 0);
    }

    #[test]
    fn test_known_english_count() {
        // "hello world" is two tokens in cl100k_base
        assert_eq!(count_tokens("hello world").unwrap(), 2);
    }

    #[test]
    fn test_longer_text_has_more_tokens() {
        let short = count_tokens("The capital of France").unwrap();
        let long = count_tokens("The capital of France is Paris, a city on the Seine.").unwrap();
        assert!(long > short);
    }

    #[test]
    fn test_cjk_text_counts() {
        assert!(count_tokens("人工智能的历史").unwrap() > 0);
    }

    #[test]
    fn test_sentinel_variant_matches() {
        assert_eq!(count_tokens_or_sentinel("hello world"), 2);
    }
}
