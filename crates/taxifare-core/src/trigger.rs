//! Pipeline triggering and scheduling.
//!
//! Builds [`PipelineJobRequest`]s for the training and prediction pipelines
//! from CLI arguments, Pub/Sub style payloads, or table-change audit events,
//! and submits them through a [`PipelineService`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use taxifare_state::{
    JobState, PipelineJobHandle, PipelineJobRequest, PipelineService, ScheduleHandle,
    ScheduleRequest,
};
use tracing::{info, Instrument};

use crate::config::{Settings, TriggerConfig};
use crate::domain::error::{PipelineError, Result};
use crate::metrics::METRICS;
use crate::obs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Training,
    Prediction,
}

impl FromStr for PipelineKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "training" => Ok(Self::Training),
            "prediction" => Ok(Self::Prediction),
            other => Err(PipelineError::Configuration(format!(
                "unknown pipeline type '{}', expected training or prediction",
                other
            ))),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Training => f.write_str("training"),
            Self::Prediction => f.write_str("prediction"),
        }
    }
}

async fn submit(
    service: &dyn PipelineService,
    request: PipelineJobRequest,
) -> Result<PipelineJobHandle> {
    let handle = service.submit(&request).await?;
    METRICS.inc_pipelines_submitted();
    obs::emit_pipeline_submitted(&handle.name, &request.display_name, &request.template_uri);
    Ok(handle)
}

/// Parameters of a manually triggered run.
pub fn trigger_parameters(
    settings: &Settings,
    display_name: &str,
    kind: PipelineKind,
) -> BTreeMap<String, Value> {
    match kind {
        PipelineKind::Training => BTreeMap::from([
            ("project".to_string(), Value::from(settings.project.clone())),
            ("location".to_string(), Value::from(settings.location.clone())),
            (
                "training_job_display_name".to_string(),
                Value::from(format!("{}-training-job", display_name)),
            ),
            (
                "base_output_dir".to_string(),
                Value::from(settings.pipeline_root.clone()),
            ),
        ]),
        PipelineKind::Prediction => BTreeMap::new(),
    }
}

/// Submit one run of a compiled pipeline template.
pub async fn trigger_pipeline(
    service: &dyn PipelineService,
    settings: &Settings,
    template_path: &str,
    display_name: &str,
    kind: PipelineKind,
    enable_caching: bool,
) -> Result<PipelineJobHandle> {
    let request = PipelineJobRequest {
        display_name: display_name.to_string(),
        template_uri: template_path.to_string(),
        pipeline_root: settings.pipeline_root.clone(),
        parameter_values: trigger_parameters(settings, display_name, kind),
        enable_caching,
        service_account: settings.service_account.clone(),
    };
    submit(service, request).await
}

/// Block until a submitted run reaches a terminal state.
///
/// Polls every `poll_interval`. Any terminal state other than `Succeeded`
/// is an error.
pub async fn wait_for_pipeline(
    service: &dyn PipelineService,
    name: &str,
    poll_interval: Duration,
) -> Result<JobState> {
    async {
        let state = loop {
            let state = service.pipeline_job_state(name).await?;
            obs::emit_job_polled(name, &state);
            if state.is_terminal() {
                break state;
            }
            tokio::time::sleep(poll_interval).await;
        };

        if state != JobState::Succeeded {
            return Err(PipelineError::JobFailed {
                name: name.to_string(),
                state: format!("{:?}", state),
            });
        }
        info!("pipeline run {} succeeded", name);
        Ok(state)
    }
    .instrument(obs::step_span("wait_for_pipeline", name))
    .await
}

// ---------------------------------------------------------------------------
// Payload triggers
// ---------------------------------------------------------------------------

/// Normalised trigger payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub template_path: String,
    pub enable_caching: Option<bool>,
    pub timestamp: String,
    pub use_latest_data: bool,
}

/// Normalise a raw payload (`{"attributes": {...}, "data": {...}}`).
///
/// A missing `data` object counts as empty. `enable_caching` arrives as a
/// string and is true only for a case-insensitive `"true"`. `timestamp`
/// defaults to empty and `use_latest_data` to true.
pub fn convert_payload(payload: &Value) -> Result<TriggerPayload> {
    let template_path = payload
        .pointer("/attributes/template_path")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            PipelineError::InvalidPayload("attributes.template_path is required".to_string())
        })?
        .to_string();

    let empty = serde_json::Map::new();
    let data = match payload.get("data") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(PipelineError::InvalidPayload(format!(
                "data must be an object, got {}",
                other
            )))
        }
    };

    let enable_caching = match data.get("enable_caching") {
        None => None,
        Some(Value::String(s)) => Some(s.eq_ignore_ascii_case("true")),
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => {
            return Err(PipelineError::InvalidPayload(format!(
                "enable_caching must be a string, got {}",
                other
            )))
        }
    };
    let timestamp = data
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let use_latest_data = data
        .get("use_latest_data")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    Ok(TriggerPayload {
        template_path,
        enable_caching,
        timestamp,
        use_latest_data,
    })
}

/// Trigger an end-to-end test run described by a payload.
pub async fn trigger_pipeline_from_payload(
    service: &dyn PipelineService,
    settings: &Settings,
    payload: &TriggerPayload,
    kind: PipelineKind,
    enable_caching: bool,
) -> Result<PipelineJobHandle> {
    info!("Triggering pipeline with caching: {}", enable_caching);
    let display_name = format!("e2e-test-{}-pipeline", kind);

    let mut parameter_values = trigger_parameters(settings, &display_name, kind);
    parameter_values.insert("timestamp".to_string(), Value::from(payload.timestamp.clone()));
    parameter_values.insert("use_latest_data".to_string(), Value::from(payload.use_latest_data));

    let request = PipelineJobRequest {
        display_name,
        template_uri: payload.template_path.clone(),
        pipeline_root: settings.pipeline_root.clone(),
        parameter_values,
        enable_caching,
        service_account: settings.service_account.clone(),
    };
    submit(service, request).await
}

// ---------------------------------------------------------------------------
// Table-change events
// ---------------------------------------------------------------------------

/// Rows inserted according to a BigQuery audit-log event.
///
/// The count may be a string or a number; anything unreadable counts as 0.
pub fn inserted_rows(event: &Value) -> u64 {
    match event.pointer("/protoPayload/metadata/tableDataChange/insertedRowsCount") {
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

/// Request submitted for a configured trigger.
pub fn config_request(config: &TriggerConfig) -> PipelineJobRequest {
    let mut parameter_values = BTreeMap::from([
        ("project".to_string(), Value::from(config.project.clone())),
        ("location".to_string(), Value::from(config.location.clone())),
        ("bq_location".to_string(), Value::from(config.bq_location.clone())),
        ("use_latest_data".to_string(), Value::from(config.use_latest_data)),
        ("timestamp".to_string(), Value::from(config.timestamp.clone())),
        (
            "base_output_dir".to_string(),
            Value::from(config.base_output_dir.clone()),
        ),
    ]);
    let (key, suffix) = match config.kind {
        PipelineKind::Training => ("training_job_display_name", "training-job"),
        PipelineKind::Prediction => ("prediction_job_display_name", "prediction-job"),
    };
    parameter_values.insert(
        key.to_string(),
        Value::from(format!("{}-{}", config.display_name, suffix)),
    );

    PipelineJobRequest {
        display_name: format!("{}-pipeline", config.display_name),
        template_uri: config.template_path().to_string(),
        pipeline_root: config.base_output_dir.clone(),
        parameter_values,
        enable_caching: false,
        service_account: None,
    }
}

/// Submit the configured pipeline when a table-change event reports new rows.
///
/// Returns `None` when the event inserted nothing.
pub async fn handle_table_change(
    event: &Value,
    config: &TriggerConfig,
    service: &dyn PipelineService,
) -> Result<Option<PipelineJobHandle>> {
    let rows = inserted_rows(event);
    if rows == 0 {
        info!("table change inserted no rows, nothing to trigger");
        return Ok(None);
    }
    info!("table change inserted {} rows, triggering {} pipeline", rows, config.kind);
    submit(service, config_request(config)).await.map(Some)
}

/// Follow-up run once training finished: the prediction pipeline.
pub async fn on_training_complete(
    config: &TriggerConfig,
    service: &dyn PipelineService,
) -> Result<PipelineJobHandle> {
    let prediction = config.with_kind(PipelineKind::Prediction);
    submit(service, config_request(&prediction)).await
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

/// Check that `cron` has five whitespace-separated fields.
pub fn validate_cron(cron: &str) -> Result<()> {
    let fields = cron.split_whitespace().count();
    if fields != 5 {
        return Err(PipelineError::Configuration(format!(
            "cron expression '{}' has {} fields, expected 5",
            cron, fields
        )));
    }
    Ok(())
}

/// Create a recurring schedule for a pipeline.
pub async fn schedule_pipeline(
    service: &dyn PipelineService,
    request: &ScheduleRequest,
) -> Result<ScheduleHandle> {
    validate_cron(&request.cron)?;
    if request.max_concurrent_run_count == 0 {
        return Err(PipelineError::Configuration(
            "max_concurrent_run_count must be positive".to_string(),
        ));
    }
    if request.max_run_count == Some(0) {
        return Err(PipelineError::Configuration(
            "max_run_count must be positive".to_string(),
        ));
    }
    let handle = service.create_schedule(request).await?;
    obs::emit_schedule_created(&handle.name, &handle.cron);
    Ok(handle)
}
