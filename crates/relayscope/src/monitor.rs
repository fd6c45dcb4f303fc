//! Facade over a detector and its cadence.
//!
//! This is the surface front-ends talk to: run a cycle, read results,
//! update the configuration, start and stop periodic detection.

use crate::config::DetectorConfig;
use crate::detector::{DetectionStatus, Detector};
use crate::result::{RelayscopeError, RelayscopeResult};
use crate::scheduler::{CadenceState, CycleRunner, Scheduler};
use crate::verdict::DetectionResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// What a reader should show as "latest".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LatestView {
    /// A cycle is running and no result from it is stored yet
    Detecting {
        /// Start of the running cycle
        since: DateTime<Utc>,
    },
    /// The newest stored result
    Ready {
        /// The result
        result: Box<DetectionResult>,
    },
    /// Nothing stored and nothing running
    Empty,
}

/// Detector plus scheduler.
///
/// Configuration edits and cadence changes go through one lock, so the
/// configured interval and the live cadence always agree.
#[derive(Debug)]
pub struct Monitor {
    detector: Arc<Detector>,
    scheduler: Scheduler,
    control: Mutex<()>,
}

impl Monitor {
    /// Wrap a detector. No cadence is started.
    pub fn new(detector: Detector) -> Self {
        let detector = Arc::new(detector);
        let runner: Arc<dyn CycleRunner> = Arc::clone(&detector) as Arc<dyn CycleRunner>;
        Self {
            scheduler: Scheduler::new(runner),
            detector,
            control: Mutex::new(()),
        }
    }

    fn control(&self) -> MutexGuard<'_, ()> {
        self.control
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Build a detector from `config` and start its cadence if one is set.
    ///
    /// Must be called within a tokio runtime when `interval_minutes > 0`.
    pub fn from_config(config: DetectorConfig) -> RelayscopeResult<Self> {
        let minutes = config.interval_minutes;
        let monitor = Self::new(Detector::new(config)?);
        if minutes > 0 {
            monitor.scheduler.start(minutes);
        }
        Ok(monitor)
    }

    /// The underlying detector.
    pub const fn detector(&self) -> &Arc<Detector> {
        &self.detector
    }

    /// Run one cycle and return its result.
    pub async fn run_detection_cycle(&self) -> DetectionResult {
        self.detector.detect_once().await
    }

    /// Start a cycle in the background.
    pub fn detect_now(&self) {
        drop(self.detector.detect_now());
    }

    /// Stored results, oldest first.
    pub fn history(&self) -> Vec<DetectionResult> {
        self.detector.history().all()
    }

    /// Most recent result.
    pub fn latest(&self) -> Option<DetectionResult> {
        self.detector.latest()
    }

    /// Latest result, or "detecting" while a newer cycle is in flight.
    pub fn latest_view(&self) -> LatestView {
        let status = self.detector.status();
        let latest = self.detector.latest();
        resolve_latest(status, latest)
    }

    /// Current configuration.
    pub fn config(&self) -> DetectorConfig {
        self.detector.config()
    }

    /// Current cycle status.
    pub fn status(&self) -> DetectionStatus {
        self.detector.status()
    }

    /// Replace the configuration, restarting the cadence if its period
    /// changed. Must be called within a tokio runtime.
    pub fn update_configuration(&self, config: DetectorConfig) {
        let _control = self.control();
        let minutes = config.interval_minutes;
        let previous = self.detector.update_config(config);
        if previous.interval_minutes != minutes {
            self.scheduler.start(minutes);
        }
    }

    /// Start a cadence of `minutes`, replacing any active one.
    pub fn start_cadence(&self, minutes: u32) -> RelayscopeResult<()> {
        if minutes == 0 {
            return Err(RelayscopeError::invalid_config(
                "cadence must be at least 1 minute",
            ));
        }
        let _control = self.control();
        self.detector.set_interval_minutes(minutes);
        self.scheduler.start(minutes);
        Ok(())
    }

    /// Stop the active cadence, if any.
    pub fn stop_cadence(&self) {
        let _control = self.control();
        self.detector.set_interval_minutes(0);
        self.scheduler.stop();
    }

    /// Current cadence state.
    pub fn cadence_state(&self) -> CadenceState {
        self.scheduler.state()
    }
}

fn resolve_latest(status: DetectionStatus, latest: Option<DetectionResult>) -> LatestView {
    if let (true, Some(since)) = (status.detecting, status.started_at) {
        let stale = latest.as_ref().map_or(true, |r| r.timestamp < since);
        if stale {
            return LatestView::Detecting { since };
        }
    }
    latest.map_or(LatestView::Empty, |result| LatestView::Ready {
        result: Box::new(result),
    })
}
