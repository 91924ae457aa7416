//! Structured observability hooks for pipeline step events.
//!
//! - `PipelineSpan`: RAII guard scoping every log line of one step run
//! - `emit_*`: one `info!` event per decision or side effect worth auditing
//!
//! Filter with `TAXIFARE_LOG` (see [`crate::telemetry`]).

use tracing::{info, warn};

use crate::arbiter::ArbitrationResult;

/// Span for one step run. Async steps attach it with `Instrument`.
pub fn step_span(step: &str, subject: &str) -> tracing::Span {
    tracing::info_span!("taxifare.step", step = %step, subject = %subject)
}

/// RAII guard that enters a step-scoped span on the current thread.
///
/// ```ignore
/// let _span = PipelineSpan::enter("arbitrate", "taxi-traffic-model");
/// ```
pub struct PipelineSpan {
    _span: tracing::span::EnteredSpan,
}

impl PipelineSpan {
    pub fn enter(step: &str, subject: &str) -> Self {
        Self {
            _span: step_span(step, subject).entered(),
        }
    }
}

/// Best trial chosen out of `trials_scanned` trials.
pub fn emit_trial_selected(job_name: &str, trials_scanned: usize, best_value: f64) {
    info!(
        event = "trial.selected",
        job_name = %job_name,
        trials_scanned = trials_scanned,
        best_value = best_value,
    );
}

pub fn emit_arbitration(model_name: &str, metric: &str, result: &ArbitrationResult) {
    info!(
        event = "model.arbitrated",
        model_name = %model_name,
        metric = %metric,
        winner = ?result.winner,
        is_default_version = result.is_default_version,
        challenger_value = ?result.challenger_value,
        champion_value = ?result.champion_value,
    );
}

pub fn emit_model_uploaded(versioned_resource_name: &str, is_default_version: bool) {
    info!(
        event = "model.uploaded",
        model = %versioned_resource_name,
        is_default_version = is_default_version,
    );
}

pub fn emit_metric_read(name: &str, value: f64) {
    info!(event = "metric.read", name = %name, value = value);
}

pub fn emit_pipeline_submitted(job_name: &str, display_name: &str, template: &str) {
    info!(
        event = "pipeline.submitted",
        job_name = %job_name,
        display_name = %display_name,
        template = %template,
    );
}

pub fn emit_schedule_created(schedule_name: &str, cron: &str) {
    info!(event = "schedule.created", schedule_name = %schedule_name, cron = %cron);
}

/// Batch prediction job state observed while polling.
pub fn emit_job_polled(job_name: &str, state: &dyn std::fmt::Debug) {
    tracing::debug!(event = "job.polled", job_name = %job_name, state = ?state);
}

/// A step continued without an optional artifact (warning level).
pub fn emit_artifact_missing(path: &str) {
    warn!(event = "artifact.missing", path = %path);
}
