//! Handler for `relayscope serve`: a JSON HTTP API over a [`Monitor`].
//!
//! | Method | Path                    | Action                               |
//! |--------|-------------------------|--------------------------------------|
//! | GET    | `/api/config`           | current configuration, key redacted  |
//! | POST   | `/api/config`           | replace configuration                |
//! | GET    | `/api/results`          | full history, oldest first           |
//! | GET    | `/api/results/latest`   | latest result or detection status    |
//! | POST   | `/api/detect`           | start a cycle in the background      |
//! | POST   | `/api/schedule/start`   | start a cadence `{"interval": n}`    |
//! | POST   | `/api/schedule/stop`    | stop the cadence                     |

use crate::commands::ServeArgs;
use crate::config::{resolve_detector_config, CliConfig};
use crate::error::{CliError, CliResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use relayscope::{CadenceState, DetectionResult, DetectorConfig, LatestView, Monitor};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared state of every route.
pub type AppState = Arc<Monitor>;

/// Error body `{"error": "..."}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Configuration as shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigView {
    /// Endpoint URL
    pub endpoint: String,
    /// Redacted API key
    pub api_key: String,
    /// Model
    pub model: String,
    /// Configured cadence, 0 when disabled
    pub interval_minutes: u32,
    /// History capacity
    pub max_history: usize,
    /// Raw response retention
    pub save_raw_response: bool,
    /// Live cadence state
    pub cadence: CadenceState,
}

impl ConfigView {
    fn new(config: &DetectorConfig, cadence: CadenceState) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: redact_key(&config.api_key),
            model: config.model.clone(),
            interval_minutes: config.interval_minutes,
            max_history: config.max_history,
            save_raw_response: config.save_raw_response,
            cadence,
        }
    }
}

/// Show the first three and last four characters of a key.
pub fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => String::new(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = chars[..3].iter().collect();
            let tail: String = chars[n - 4..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    interval: i64,
}

/// Build the API router.
pub fn router(monitor: AppState) -> Router {
    Router::new()
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/results", get(get_results))
        .route("/api/results/latest", get(get_latest))
        .route("/api/detect", post(detect_now))
        .route("/api/schedule/start", post(start_schedule))
        .route("/api/schedule/stop", post(stop_schedule))
        .with_state(monitor)
}

async fn get_config(State(monitor): State<AppState>) -> Json<ConfigView> {
    Json(ConfigView::new(&monitor.config(), monitor.cadence_state()))
}

async fn update_config(
    State(monitor): State<AppState>,
    payload: Result<Json<DetectorConfig>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(mut config) = payload?;
    let current = monitor.config();

    // a client echoing GET /api/config back sends the redacted key
    if config.api_key.is_empty() || config.api_key == redact_key(&current.api_key) {
        config.api_key = current.api_key;
    }
    let config = config.normalized();
    config
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    monitor.update_configuration(config);
    Ok(Json(json!({ "message": "configuration updated" })))
}

async fn get_results(State(monitor): State<AppState>) -> Json<Vec<DetectionResult>> {
    Json(monitor.history())
}

async fn get_latest(State(monitor): State<AppState>) -> Json<serde_json::Value> {
    let body = match monitor.latest_view() {
        LatestView::Ready { result } => serde_json::to_value(*result).unwrap_or_default(),
        LatestView::Detecting { since } => json!({
            "status": "detecting",
            "message": "detection in progress",
            "since": since,
        }),
        LatestView::Empty => json!({ "message": "no results yet" }),
    };
    Json(body)
}

async fn detect_now(State(monitor): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    monitor.detect_now();
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": "detection started" })),
    )
}

async fn start_schedule(
    State(monitor): State<AppState>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = payload?;
    let minutes = u32::try_from(request.interval)
        .ok()
        .filter(|m| *m >= 1)
        .ok_or_else(|| ApiError::bad_request("interval must be a whole number of minutes >= 1"))?;

    monitor
        .start_cadence(minutes)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(json!({
        "message": format!("scheduled detection every {minutes} minute(s)"),
        "interval": minutes,
    })))
}

async fn stop_schedule(State(monitor): State<AppState>) -> Json<serde_json::Value> {
    monitor.stop_cadence();
    Json(json!({ "message": "scheduled detection stopped" }))
}

/// Execute `relayscope serve`.
pub async fn execute_serve(_config: &CliConfig, args: &ServeArgs) -> CliResult<()> {
    let mut detector_config = resolve_detector_config(&args.endpoint)?;
    if let Some(minutes) = args.interval {
        detector_config = detector_config.with_interval_minutes(minutes);
    }

    let monitor = Arc::new(Monitor::from_config(detector_config)?);
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CliError::server(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, endpoint = %monitor.config().endpoint, "serving relayscope API");
    eprintln!("Relayscope API listening on http://{addr} (Ctrl+C to stop)");

    axum::serve(listener, router(Arc::clone(&monitor)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .map_err(|e| CliError::server(e.to_string()))?;

    monitor.stop_cadence();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use relayscope::Detector;
    use tower::ServiceExt;

    const UNREACHABLE: &str = "http://127.0.0.1:9/v1/chat/completions";

    fn app() -> (AppState, Router) {
        let config = DetectorConfig::new(UNREACHABLE, "sk-test-abcdefgh");
        let monitor = Arc::new(Monitor::new(Detector::new(config).unwrap()));
        (Arc::clone(&monitor), router(monitor))
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[test]
    fn test_redact_key() {
        assert_eq!(redact_key(""), "");
        assert_eq!(redact_key("short"), "*****");
        assert_eq!(redact_key("sk-test-abcdefgh"), "sk-...efgh");
    }

    #[tokio::test]
    async fn test_get_config_redacts_key() {
        let (_, app) = app();
        let (status, body) = call(app, "GET", "/api/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoint"], UNREACHABLE);
        assert_eq!(body["apiKey"], "sk-...efgh");
        assert_eq!(body["cadence"]["state"], "stopped");
    }

    #[tokio::test]
    async fn test_update_config_keeps_redacted_key() {
        let (monitor, app) = app();
        let body = r#"{"endpoint":"https://other.example/v1/chat/completions","apiKey":"sk-...efgh","model":"gpt-4o","intervalMinutes":0,"maxHistory":5,"saveRawResponse":false}"#;
        let (status, _) = call(app, "POST", "/api/config", Some(body)).await;

        assert_eq!(status, StatusCode::OK);
        let config = monitor.config();
        assert_eq!(config.endpoint, "https://other.example/v1/chat/completions");
        assert_eq!(config.api_key, "sk-test-abcdefgh");
        assert_eq!(config.max_history, 5);
        assert!(!config.save_raw_response);
    }

    #[tokio::test]
    async fn test_update_config_with_interval_starts_cadence() {
        let (monitor, app) = app();
        let body = format!(r#"{{"endpoint":"{UNREACHABLE}","intervalMinutes":15}}"#);
        let (status, _) = call(app, "POST", "/api/config", Some(&body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(monitor.cadence_state(), CadenceState::Running { minutes: 15 });
    }

    #[tokio::test]
    async fn test_update_config_rejects_bad_endpoint() {
        let (_, app) = app();
        let (status, body) = call(app, "POST", "/api/config", Some(r#"{"endpoint":"ftp://x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("http(s)"));
    }

    #[tokio::test]
    async fn test_update_config_rejects_malformed_json() {
        let (_, app) = app();
        let (status, body) = call(app, "POST", "/api/config", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid request body"));
    }

    #[tokio::test]
    async fn test_results_empty() {
        let (_, app) = app();
        let (status, body) = call(app.clone(), "GET", "/api/results", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (_, latest) = call(app, "GET", "/api/results/latest", None).await;
        assert_eq!(latest["message"], "no results yet");
    }

    #[tokio::test]
    async fn test_latest_returns_stored_result() {
        let (monitor, app) = app();
        let result = monitor.run_detection_cycle().await;
        let (status, body) = call(app, "GET", "/api/results/latest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], result.id.to_string());
        assert_eq!(body["is_real_api"], false);
    }

    #[tokio::test]
    async fn test_detect_is_acknowledged_immediately() {
        let (_, app) = app();
        let (status, body) = call(app, "POST", "/api/detect", None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["message"], "detection started");
    }

    #[tokio::test]
    async fn test_schedule_start_and_stop() {
        let (monitor, app) = app();
        let (status, body) = call(app.clone(), "POST", "/api/schedule/start", Some(r#"{"interval":5}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["interval"], 5);
        assert_eq!(monitor.cadence_state(), CadenceState::Running { minutes: 5 });

        let (status, _) = call(app, "POST", "/api/schedule/stop", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(monitor.cadence_state(), CadenceState::Stopped);
    }

    #[tokio::test]
    async fn test_schedule_start_rejects_zero() {
        let (monitor, app) = app();
        let (status, _) = call(app.clone(), "POST", "/api/schedule/start", Some(r#"{"interval":0}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(app, "POST", "/api/schedule/start", Some(r#"{}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(monitor.cadence_state(), CadenceState::Stopped);
    }
}
