//! Handler for `relayscope detect`.

use crate::commands::DetectArgs;
use crate::config::{resolve_detector_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::{print_json, ProgressReporter};
use relayscope::{ChatClient, DetectionResult, Detector};

/// Warn when nothing answers at `endpoint`. Never fatal.
pub async fn preflight(reporter: &ProgressReporter, endpoint: &str) -> CliResult<()> {
    let client = ChatClient::new()?;
    if !client.check_endpoint(endpoint).await {
        reporter.warning(&format!(
            "{endpoint} did not answer a reachability check, probing anyway"
        ));
    }
    Ok(())
}

/// Map a verdict to the process outcome.
pub fn verdict_outcome(result: &DetectionResult, strict: bool) -> CliResult<()> {
    if strict && !result.is_real_api {
        return Err(CliError::relay_detected(&result.endpoint));
    }
    Ok(())
}

/// Execute `relayscope detect`.
pub async fn execute_detect(config: &CliConfig, args: &DetectArgs) -> CliResult<()> {
    let detector_config = resolve_detector_config(&args.endpoint)?;
    let mut reporter = ProgressReporter::new(
        config.color.should_color(),
        config.verbosity.is_quiet() || args.json,
    );

    preflight(&reporter, &detector_config.endpoint).await?;

    let detector = Detector::new(detector_config)?;
    reporter.start_spinner("Running probes");
    let result = detector.detect_once().await;
    reporter.finish();

    if args.json {
        print_json(&result);
    } else {
        reporter.result(&result);
    }

    verdict_outcome(&result, args.strict)
}
