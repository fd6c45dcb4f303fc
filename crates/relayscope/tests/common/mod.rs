//! In-process upstream used by the integration tests.
//!
//! Serves `POST /v1/chat/completions` in one of several behaviors and
//! records the `Authorization` header of every request.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// How the stub answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Honors every parameter
    Genuine,
    /// Honors every parameter but sends `null` bookkeeping fields and
    /// float usage counts
    LooseGenuine,
    /// Accepts parameters and ignores them
    Relay,
    /// Answers 500 with a long body
    ServerError,
    /// Answers 200 with a non-JSON body
    Garbage,
    /// Answers 200 with `{}` (no choices, no usage)
    EmptyObject,
}

#[derive(Debug)]
struct Shared {
    behavior: Mutex<Behavior>,
    auth: Mutex<Vec<String>>,
}

/// A running stub upstream.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Full chat-completion URL
    pub url: String,
    shared: Arc<Shared>,
}

impl Upstream {
    /// Bind on 127.0.0.1:0 and serve in the background.
    pub async fn start(behavior: Behavior) -> Self {
        let shared = Arc::new(Shared {
            behavior: Mutex::new(behavior),
            auth: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/v1/chat/completions", post(completions))
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/v1/chat/completions"),
            shared,
        }
    }

    /// Switch behavior for subsequent requests.
    pub fn set_behavior(&self, behavior: Behavior) {
        *self.shared.behavior.lock().unwrap() = behavior;
    }

    /// `Authorization` headers seen so far.
    pub fn auth_headers(&self) -> Vec<String> {
        self.shared.auth.lock().unwrap().clone()
    }

    /// Number of requests served.
    pub fn request_count(&self) -> usize {
        self.shared.auth.lock().unwrap().len()
    }
}

async fn completions(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    shared.auth.lock().unwrap().push(auth);

    let behavior = *shared.behavior.lock().unwrap();
    match behavior {
        Behavior::Genuine => Json(genuine(&request)).into_response(),
        Behavior::LooseGenuine => Json(loose(genuine(&request))).into_response(),
        Behavior::Relay => Json(relay()).into_response(),
        Behavior::ServerError => {
            (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded ".repeat(100)).into_response()
        }
        Behavior::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
        Behavior::EmptyObject => Json(json!({})).into_response(),
    }
}

fn choice(index: u64, content: &str, logprobs: Value) -> Value {
    json!({
        "index": index,
        "message": { "role": "assistant", "content": content },
        "logprobs": logprobs,
        "finish_reason": "stop"
    })
}

fn genuine(request: &Value) -> Value {
    let n = request["n"].as_u64().unwrap_or(1);
    let logprobs = if request["logprobs"].as_bool() == Some(true) {
        json!({ "content": [{ "token": "Paris", "logprob": -0.01, "top_logprobs": [] }] })
    } else {
        Value::Null
    };
    let completion_tokens = request["max_tokens"].as_u64().unwrap_or(6);
    let choices: Vec<Value> = (0..n)
        .map(|i| choice(i, "A short answer that stops early", logprobs.clone()))
        .collect();

    json!({
        "id": "chatcmpl-genuine",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": request["model"],
        "choices": choices,
        "usage": {
            "prompt_tokens": 20,
            "completion_tokens": completion_tokens,
            "total_tokens": 20 + completion_tokens
        }
    })
}

fn loose(mut body: Value) -> Value {
    body["id"] = Value::Null;
    body["model"] = Value::Null;
    body["created"] = json!(1_700_000_000.0);
    if let Some(choices) = body["choices"].as_array_mut() {
        for choice in choices {
            choice["index"] = Value::Null;
        }
    }
    for key in ["prompt_tokens", "completion_tokens", "total_tokens"] {
        if let Some(n) = body["usage"][key].as_u64() {
            body["usage"][key] = json!(n as f64);
        }
    }
    body
}

fn relay() -> Value {
    json!({
        "id": "chatcmpl-relay",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-4o-mini",
        "choices": [choice(0, "Once upon a time there was a robot. THE_END", Value::Null)],
        "usage": { "prompt_tokens": 20, "completion_tokens": 150, "total_tokens": 170 }
    })
}
