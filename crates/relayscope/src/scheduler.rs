//! Periodic re-evaluation.
//!
//! A cadence is a background task driven by a tokio interval. Each tick
//! spawns the cycle on its own task, so aborting the cadence stops future
//! ticks without cancelling a cycle that is already running.
//!
//! At most one scheduled cycle is in flight per scheduler. A tick that
//! arrives while the previous cycle is still running is skipped, across
//! cadence replacement too.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Anything that can run one detection cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    /// Run a single cycle to completion.
    async fn run_cycle(&self);
}

/// Observable cadence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CadenceState {
    /// No cadence is active
    Stopped,
    /// A cadence fires every `minutes`
    Running {
        /// Period in minutes
        minutes: u32,
    },
}

#[derive(Debug)]
struct Cadence {
    minutes: u32,
    handle: JoinHandle<()>,
}

/// Marks a scheduled cycle as in flight; cleared on drop.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owner of at most one active cadence.
pub struct Scheduler {
    runner: Arc<dyn CycleRunner>,
    in_flight: Arc<AtomicBool>,
    active: Mutex<Option<Cadence>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn period(minutes: u32) -> Duration {
    Duration::from_secs(u64::from(minutes) * 60)
}

impl Scheduler {
    /// Create a scheduler with no active cadence.
    pub fn new(runner: Arc<dyn CycleRunner>) -> Self {
        Self {
            runner,
            in_flight: Arc::new(AtomicBool::new(false)),
            active: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Cadence>> {
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Start a cadence of `minutes`, replacing any active one.
    ///
    /// `0` leaves the scheduler stopped. Must be called within a tokio
    /// runtime. The first cycle fires one full period after the call.
    pub fn start(&self, minutes: u32) {
        let mut active = self.lock();
        if let Some(previous) = active.take() {
            previous.handle.abort();
            tracing::info!(minutes = previous.minutes, "cadence stopped");
        }
        if minutes == 0 {
            return;
        }

        let runner = Arc::clone(&self.runner);
        let in_flight = Arc::clone(&self.in_flight);
        let every = period(minutes);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(guard) = InFlight::acquire(&in_flight) else {
                    tracing::debug!(minutes, "previous cycle still running, tick skipped");
                    continue;
                };
                tracing::debug!(minutes, "cadence tick");
                let runner = Arc::clone(&runner);
                tokio::spawn(async move {
                    let _guard = guard;
                    runner.run_cycle().await;
                });
            }
        });

        tracing::info!(minutes, "cadence started");
        *active = Some(Cadence { minutes, handle });
    }

    /// Stop the active cadence, if any.
    pub fn stop(&self) {
        if let Some(previous) = self.lock().take() {
            previous.handle.abort();
            tracing::info!(minutes = previous.minutes, "cadence stopped");
        }
    }

    /// Whether a scheduled cycle is still running.
    pub fn cycle_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Current state.
    pub fn state(&self) -> CadenceState {
        self.lock()
            .as_ref()
            .map_or(CadenceState::Stopped, |c| CadenceState::Running {
                minutes: c.minutes,
            })
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(cadence) = self.lock().take() {
            cadence.handle.abort();
        }
    }
}
