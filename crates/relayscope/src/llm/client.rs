//! OpenAI-compatible HTTP client used by the probes.
//!
//! Requests go to the configured endpoint URL as-is (no path is appended),
//! since relays are frequently mounted under arbitrary paths. Response types
//! only model what the probes read. Bookkeeping fields such as `id` or
//! `created` are ignored, and usage counts are accepted as integers or
//! floats, so a probe fails on the parameter it checks and not on a relay's
//! loose JSON.

use crate::result::{ProbeError, RelayscopeResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

/// Fixed timeout applied to every probe request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the reachability pre-flight.
pub const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Chat message role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
}

/// A single chat message in a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// The role of the message author.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Parameters for a chat completion request.
///
/// Only `model` and `messages` are always sent; each probe sets the one or
/// two parameters it is checking.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// The messages for the chat completion.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Request token log-probabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    /// Number of alternatives per token position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    /// Number of choices to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Stop sequences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ChatRequest {
    /// A request with a single user message and no optional parameters.
    pub fn user_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            ..Self::default()
        }
    }
}

/// A token count as a relay may send it: integer, float or `null`.
///
/// Non-numeric and negative values read as absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn count_from_value(value: &Value) -> Option<u32> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_u64()
        .map(|c| u32::try_from(c).unwrap_or(u32::MAX))
        .or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u32)
        })
}

/// Token usage statistics. Every field is optional on the wire.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_tokens: Option<u32>,
    /// Tokens generated.
    #[serde(default, deserialize_with = "lenient_count")]
    pub completion_tokens: Option<u32>,
    /// Total tokens (prompt + completion).
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_tokens: Option<u32>,
}

/// The message inside a response choice.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ResponseMessage {
    /// Generated content: normally a string, `null` for tool calls and some
    /// refusals, an array for multi-part content.
    #[serde(default)]
    pub content: Option<Value>,
}

/// A single completion choice.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ChatResponseChoice {
    /// The generated message.
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    /// Token log-probabilities, present only when requested and honored.
    #[serde(default)]
    pub logprobs: Option<Value>,
}

impl ChatResponseChoice {
    /// Generated text of this choice, if it is a string.
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_ref())
            .and_then(Value::as_str)
    }

    /// Whether `logprobs` is a JSON object.
    pub fn has_logprobs_object(&self) -> bool {
        matches!(self.logprobs, Some(Value::Object(_)))
    }
}

/// Response from a chat completion endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct ChatResponse {
    /// Generated choices; `None` when the key is absent or `null`.
    #[serde(default)]
    pub choices: Option<Vec<ChatResponseChoice>>,
    /// Token usage statistics.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// First choice, if the response has any.
    pub fn first_choice(&self) -> Option<&ChatResponseChoice> {
        self.choices.as_ref().and_then(|c| c.first())
    }

    /// Text of the first choice, or the empty string.
    pub fn first_content(&self) -> &str {
        self.first_choice().and_then(ChatResponseChoice::content).unwrap_or("")
    }
}

/// A chat response with the raw body and timing.
#[derive(Debug, Clone)]
pub struct TimedChatResponse {
    /// The decoded response.
    pub response: ChatResponse,
    /// The body exactly as received.
    pub raw_body: String,
    /// Total request duration (time to last byte).
    pub latency: Duration,
}

/// Where probes are sent: a snapshot of endpoint and credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Full chat-completion URL.
    pub url: String,
    /// Bearer credential.
    pub api_key: String,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// HTTP client shared by all probes of a detector.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
}

impl ChatClient {
    /// Create a client with the fixed probe timeout.
    pub fn new() -> RelayscopeResult<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// POST a chat completion request and decode the response.
    pub async fn send(
        &self,
        endpoint: &Endpoint,
        request: &ChatRequest,
    ) -> Result<TimedChatResponse, ProbeError> {
        let payload = serde_json::to_vec(request).map_err(ProbeError::Request)?;
        let start = Instant::now();

        let resp = self
            .client
            .post(&endpoint.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&endpoint.api_key)
            .body(payload)
            .send()
            .await?;

        let status = resp.status();
        let raw_body = resp.text().await?;
        let latency = start.elapsed();

        if !status.is_success() {
            return Err(ProbeError::status(status.as_u16(), &raw_body));
        }

        let response: ChatResponse =
            serde_json::from_str(&raw_body).map_err(|e| ProbeError::decode(e, &raw_body))?;

        Ok(TimedChatResponse {
            response,
            raw_body,
            latency,
        })
    }

    /// Whether anything answers at `url`. Any HTTP status counts.
    pub async fn check_endpoint(&self, url: &str) -> bool {
        self.client
            .get(url)
            .timeout(REACHABILITY_TIMEOUT)
            .send()
            .await
            .is_ok()
    }
}
