//! Report generation for detection results.
//!
//! Produces JSON, a Markdown history table, and a plain-text summary for
//! terminals. The CLI prints [`to_text`] for each result.

use crate::probe::ProbeKind;
use crate::verdict::DetectionResult;

/// Serialize a result to a pretty-printed JSON string.
pub fn to_json(result: &DetectionResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "pass"
    } else {
        "FAIL"
    }
}

/// Produce a single Markdown table row for a result.
pub fn to_markdown_row(result: &DetectionResult) -> String {
    format!(
        "| {} | {} | {} | {} | {} | {} | {} | {} | {}/{} |",
        result.timestamp.format("%Y-%m-%d %H:%M:%S"),
        result.endpoint,
        result.model,
        result.verdict_label(),
        mark(result.max_tokens_ok),
        mark(result.logprobs_ok),
        mark(result.multiple_ok),
        mark(result.stop_sequence_ok),
        result.api_token_count,
        result.local_token_count,
    )
}

/// Header for the history Markdown table.
const TABLE_HEADER: &str = "\
| Time (UTC) | Endpoint | Model | Verdict | Max tokens | Logprobs | Multiple | Stop | Tokens (api/local) |
|------------|----------|-------|---------|------------|----------|----------|------|--------------------|";

/// Generate a complete Markdown table from multiple results.
pub fn to_markdown_table(results: &[DetectionResult]) -> String {
    let mut lines = vec![
        "## Detection History".to_string(),
        String::new(),
        TABLE_HEADER.to_string(),
    ];
    for r in results {
        lines.push(to_markdown_row(r));
    }
    lines.push(String::new());
    lines.join("\n")
}

/// Multi-line summary of one result for terminal output.
pub fn to_text(result: &DetectionResult) -> String {
    let mut lines = vec![format!(
        "{} {} ({}) at {}",
        if result.is_real_api { "GENUINE" } else { "RELAY" },
        result.endpoint,
        result.model,
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
    )];

    for kind in ProbeKind::ALL {
        let line = match result.probe(kind) {
            Some(outcome) => {
                let note = outcome
                    .error
                    .as_deref()
                    .or(outcome.detail.as_deref())
                    .unwrap_or("");
                format!("  [{}] {:<18} {note}", mark(outcome.passed), kind.label())
            }
            None => format!("  [{}] {:<18} not run", mark(false), kind.label()),
        };
        lines.push(line);
    }

    lines.push(format!(
        "  tokens: local={} api_completion={} api_total={}",
        result.local_token_count, result.api_token_count, result.api_total_tokens
    ));
    lines.join("\n")
}
