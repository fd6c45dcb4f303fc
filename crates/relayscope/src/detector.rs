//! Verdict aggregator.
//!
//! The [`Detector`] owns the configuration, the history, the HTTP client and
//! the probe suite. One call to [`Detector::detect_once`] is one detection
//! cycle: snapshot the configuration, run every probe in order, reduce the
//! runs into a [`DetectionResult`] and append it.

use crate::config::DetectorConfig;
use crate::history::History;
use crate::llm::{ChatClient, Endpoint};
use crate::probe::{self, Probe, MAX_TOKENS_PROMPT};
use crate::result::RelayscopeResult;
use crate::scheduler::CycleRunner;
use crate::tokens::count_tokens_or_sentinel;
use crate::verdict::DetectionResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Whether a cycle is running, and since when.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectionStatus {
    /// A cycle is in progress
    pub detecting: bool,
    /// Start of the running cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Single owner of detection state.
#[derive(Debug)]
pub struct Detector {
    config: RwLock<DetectorConfig>,
    history: History,
    client: ChatClient,
    probes: Vec<Box<dyn Probe>>,
    cycle: Mutex<()>,
    status: RwLock<DetectionStatus>,
}

impl Detector {
    /// Create a detector with the default probe suite.
    pub fn new(config: DetectorConfig) -> RelayscopeResult<Self> {
        Ok(Self::with_parts(
            config,
            ChatClient::new()?,
            probe::default_suite(),
        ))
    }

    /// Create a detector from explicit parts.
    pub fn with_parts(
        config: DetectorConfig,
        client: ChatClient,
        probes: Vec<Box<dyn Probe>>,
    ) -> Self {
        let config = config.normalized();
        Self {
            history: History::new(config.max_history),
            config: RwLock::new(config),
            client,
            probes,
            cycle: Mutex::new(()),
            status: RwLock::new(DetectionStatus::default()),
        }
    }

    /// Run one detection cycle and append its result.
    ///
    /// Never fails: every probe error is folded into the result. Cycles are
    /// serialized, so the history is in start order.
    pub async fn detect_once(&self) -> DetectionResult {
        let _cycle = self.cycle.lock().await;

        let config = self.config();
        let started_at = Utc::now();
        self.set_status(DetectionStatus {
            detecting: true,
            started_at: Some(started_at),
        });
        tracing::info!(endpoint = %config.endpoint, model = %config.model, "detection cycle started");

        let endpoint = Endpoint::new(config.endpoint.clone(), config.api_key.clone());
        let local_token_count = count_tokens_or_sentinel(MAX_TOKENS_PROMPT);

        let mut runs = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            runs.push(probe::run_probe(probe.as_ref(), &self.client, &endpoint, &config.model).await);
        }

        let result = DetectionResult::assemble(
            started_at,
            config.endpoint,
            config.model,
            local_token_count,
            &runs,
            config.save_raw_response,
        );
        self.history.append(result.clone());
        self.set_status(DetectionStatus::default());

        tracing::info!(
            verdict = result.verdict_label(),
            max_tokens = result.max_tokens_ok,
            logprobs = result.logprobs_ok,
            multiple = result.multiple_ok,
            stop_sequence = result.stop_sequence_ok,
            errors = result.error.as_deref().unwrap_or(""),
            "detection cycle finished"
        );
        result
    }

    /// Start a cycle on its own task and return at once.
    pub fn detect_now(self: &Arc<Self>) -> tokio::task::JoinHandle<DetectionResult> {
        let detector = Arc::clone(self);
        tokio::spawn(async move { detector.detect_once().await })
    }

    /// Snapshot of the configuration.
    pub fn config(&self) -> DetectorConfig {
        self.config
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replace the configuration; returns the previous one.
    ///
    /// A running cycle keeps its snapshot. A new `max_history` takes effect
    /// on the history immediately.
    pub fn update_config(&self, config: DetectorConfig) -> DetectorConfig {
        let config = config.normalized();
        let capacity = config.max_history;
        let previous = {
            let mut guard = self
                .config
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            std::mem::replace(&mut *guard, config)
        };
        if previous.max_history != capacity {
            self.history.set_capacity(capacity);
        }
        tracing::info!(config = ?self.config(), "configuration updated");
        previous
    }

    /// Change only the cadence; returns the previous value.
    ///
    /// Edits in place under the write lock, so a concurrent
    /// [`Detector::update_config`] is never reverted.
    pub fn set_interval_minutes(&self, minutes: u32) -> u32 {
        let mut guard = self
            .config
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::replace(&mut guard.interval_minutes, minutes)
    }

    /// Stored results.
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Most recent result.
    pub fn latest(&self) -> Option<DetectionResult> {
        self.history.latest()
    }

    /// Current cycle status.
    pub fn status(&self) -> DetectionStatus {
        *self
            .status
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_status(&self, status: DetectionStatus) {
        *self
            .status
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = status;
    }
}

#[async_trait]
impl CycleRunner for Detector {
    async fn run_cycle(&self) {
        self.detect_once().await;
    }
}
