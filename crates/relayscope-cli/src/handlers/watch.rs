//! Handler for `relayscope watch`.
//!
//! Drives a [`Scheduler`] with a runner that prints every result as soon
//! as its cycle finishes. Runs until Ctrl-C.

use crate::commands::WatchArgs;
use crate::config::{resolve_detector_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::{print_json_line, ProgressReporter};
use async_trait::async_trait;
use relayscope::{CycleRunner, Detector, Scheduler};
use std::sync::Arc;

/// Runs a cycle, then prints its result.
#[derive(Debug)]
pub struct PrintingRunner {
    detector: Arc<Detector>,
    json: bool,
    use_color: bool,
    quiet: bool,
}

impl PrintingRunner {
    /// Create a runner around `detector`.
    pub const fn new(detector: Arc<Detector>, json: bool, use_color: bool, quiet: bool) -> Self {
        Self {
            detector,
            json,
            use_color,
            quiet,
        }
    }
}

#[async_trait]
impl CycleRunner for PrintingRunner {
    async fn run_cycle(&self) {
        let result = self.detector.detect_once().await;
        if self.json {
            print_json_line(&result);
        } else {
            ProgressReporter::new(self.use_color, self.quiet).result(&result);
        }
    }
}

/// Execute `relayscope watch`.
pub async fn execute_watch(config: &CliConfig, args: &WatchArgs) -> CliResult<()> {
    let detector_config = resolve_detector_config(&args.endpoint)?.with_interval_minutes(args.interval);
    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());

    let detector = Arc::new(Detector::new(detector_config)?);
    let runner = Arc::new(PrintingRunner::new(
        Arc::clone(&detector),
        args.json,
        config.color.should_color(),
        config.verbosity.is_quiet(),
    ));
    let scheduler = Scheduler::new(Arc::clone(&runner) as Arc<dyn CycleRunner>);

    reporter.info(&format!(
        "Watching {} every {} minute(s), Ctrl-C to stop",
        detector.config().endpoint,
        args.interval
    ));

    if args.now {
        runner.run_cycle().await;
    }
    scheduler.start(args.interval);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| CliError::server(format!("failed to listen for Ctrl-C: {e}")))?;

    scheduler.stop();
    reporter.info(&format!(
        "Stopped after {} result(s)",
        detector.history().len()
    ));
    Ok(())
}
