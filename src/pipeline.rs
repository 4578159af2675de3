use std::path::Path;

use chrono::Utc;
use log::{error, info, warn};
use serde_json::Value;

use crate::error::Result;
use crate::extract::{scan_lines, CaptureMode, Correlator, JobContext};
use crate::insights::{CheckoutInsights, CheckoutMetric};
use crate::log_source::read_lines;
use crate::output::PhaseProgress;
use crate::telemetry::TelemetryReporter;

/// Extracts checkout metrics from one worker log and hands each to `reporter`.
///
/// Returns `Ok(None)` when the log is missing, empty or holds no fragments.
///
/// # Errors
///
/// Returns an error when the job context fragment lacks its run id,
/// repository or steps. Failures of individual checkout actions and of
/// telemetry delivery are logged and counted in the result instead.
pub async fn process_worker_log<R: TelemetryReporter>(
    path: &Path,
    reporter: &mut R,
    mode: CaptureMode,
) -> Result<Option<CheckoutInsights>> {
    let progress = PhaseProgress::start_scanning();

    let lines = read_lines(path);
    if lines.is_empty() {
        progress.abandon("No lines found in the file");
        warn!("No lines found in {}", path.display());
        return Ok(None);
    }

    let fragments = scan_lines(&lines, mode);
    info!(
        "Captured {} fragments from {} lines",
        fragments.len(),
        lines.len()
    );

    let Some((job, actions)) = fragments.split_first() else {
        progress.abandon("No fragments found in the file");
        warn!("No job message found in {}", path.display());
        return Ok(None);
    };

    let progress = progress.finish_scanning_start_correlating();
    let context = match JobContext::from_fragment(job) {
        Ok(context) => context,
        Err(e) => {
            progress.abandon("Job context is incomplete");
            return Err(e);
        }
    };
    info!("Run ID: {}", context.run_id);

    let (checkouts, failed_checkouts) = correlate_checkouts(&context, actions);

    let progress = progress.finish_correlating_start_reporting();
    let failed_reports = report_checkouts(reporter, &checkouts).await;
    progress.finish_reporting();

    Ok(Some(CheckoutInsights {
        log_file: path.to_path_buf(),
        collected_at: Utc::now(),
        run_id: context.run_id,
        main_repository: context.main_repository,
        total_fragments: fragments.len(),
        checkouts,
        failed_checkouts,
        failed_reports,
    }))
}

fn correlate_checkouts(context: &JobContext, actions: &[Value]) -> (Vec<CheckoutMetric>, usize) {
    let mut checkouts = Vec::new();
    let mut failed = 0;

    for result in Correlator::new(context).correlate_all(actions) {
        match result {
            Ok(metric) => {
                info!(
                    "Checkout {} of {} took {}s",
                    metric.step_id, metric.repository, metric.duration
                );
                checkouts.push(metric);
            }
            Err(e) => {
                error!("Skipping checkout action: {e}");
                failed += 1;
            }
        }
    }

    (checkouts, failed)
}

/// Reports metrics one at a time, flushing after each. Returns the number of failures.
async fn report_checkouts<R: TelemetryReporter>(
    reporter: &mut R,
    checkouts: &[CheckoutMetric],
) -> usize {
    let mut failed = 0;
    for metric in checkouts {
        if let Err(e) = reporter.report(metric).await {
            error!("Failed to report telemetry for {}: {e}", metric.step_id);
            failed += 1;
        }
    }
    failed
}
