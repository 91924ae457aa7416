//! Collaborator trait definitions for taxifare pipeline steps
//!
//! These traits are the only way pipeline steps reach the outside world:
//! - `ArtifactStore`: read/write bytes at logical artifact paths
//! - `ModelRegistry`: model lookup, versioned upload, evaluation import
//! - `JobService`: custom/tuning job results, batch prediction and table extracts
//! - `PipelineService`: pipeline run submission and scheduling
//! - `TemplateRegistry`: compiled pipeline template uploads
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for collaborator operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ArtifactStore: logical-path byte storage
// ---------------------------------------------------------------------------

/// Join a child segment onto a logical artifact path.
pub fn join_path(base: &str, child: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        child.trim_start_matches('/')
    )
}

/// Byte storage addressed by logical path (e.g. `gs://bucket/run/metrics.json`).
///
/// Guarantees:
/// - `read(p)` returns exactly the bytes last written at `p`.
/// - `list(prefix)` returns every stored path under `prefix/`, sorted.
/// - `remove_prefix(prefix)` is a no-op when nothing is stored there.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read the object at `path`. Returns `StorageError::NotFound` if absent.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Write (or overwrite) the object at `path`.
    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Whether an object exists at `path`.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// List all object paths below `prefix`, sorted.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Remove every object below `prefix`.
    async fn remove_prefix(&self, prefix: &str) -> StorageResult<()>;
}

/// Copy every object under `from` to the same relative path under `to`.
///
/// Returns the number of objects copied.
pub async fn copy_prefix(
    store: &dyn ArtifactStore,
    from: &str,
    to: &str,
) -> StorageResult<usize> {
    let from = from.trim_end_matches('/');
    let paths = store.list(from).await?;
    for path in &paths {
        let relative = &path[from.len()..];
        let data = store.read(path).await?;
        store.write(&join_path(to, relative), &data).await?;
    }
    Ok(paths.len())
}

// ---------------------------------------------------------------------------
// ModelRegistry: versioned model registry
// ---------------------------------------------------------------------------

/// One registered model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Display name shared by all versions of the model
    pub display_name: String,
    /// Model resource name (`projects/<p>/locations/<l>/models/<id>`)
    pub resource_name: String,
    /// Version identifier within the model ("1", "2", ...)
    pub version_id: String,
    /// Location of the saved model artifacts
    pub artifact_uri: String,
    pub description: String,
    pub serving_container_image_uri: String,
    /// Whether this version is served when no version is requested
    pub is_default_version: bool,
    pub created_at: DateTime<Utc>,
}

impl ModelRecord {
    /// Resource name pinned to this version (`<resource_name>@<version_id>`).
    pub fn versioned_resource_name(&self) -> String {
        format!("{}@{}", self.resource_name, self.version_id)
    }
}

/// Request to upload a model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub display_name: String,
    pub description: String,
    pub artifact_uri: String,
    pub serving_container_image_uri: String,
    /// Existing model this upload becomes a new version of
    pub parent_model: Option<String>,
    pub is_default_version: bool,
}

/// Metadata attached to an imported evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetadata {
    pub pipeline_job_id: String,
    pub evaluation_dataset_type: String,
    pub evaluation_dataset_path: Vec<String>,
}

/// Evaluation record stored against a model version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub display_name: String,
    pub metrics_schema_uri: String,
    pub metrics: BTreeMap<String, f64>,
    pub metadata: EvaluationMetadata,
}

/// Managed model registry.
///
/// Semantics:
/// - `list_models` returns the default version of every model whose display
///   name equals `display_name`.
/// - `upload` without `parent_model` creates a new model at version "1";
///   with `parent_model` it appends the next version to that model.
/// - An upload with `is_default_version` clears the flag on sibling versions.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Default versions of all models with the given display name.
    async fn list_models(&self, display_name: &str) -> StorageResult<Vec<ModelRecord>>;

    /// Upload a model version.
    async fn upload(&self, request: UploadRequest) -> StorageResult<ModelRecord>;

    /// Evaluation stored for a versioned resource name, if any.
    async fn get_model_evaluation(
        &self,
        versioned_resource_name: &str,
    ) -> StorageResult<Option<EvaluationRecord>>;

    /// Attach an evaluation to a model version.
    async fn import_model_evaluation(
        &self,
        versioned_resource_name: &str,
        evaluation: EvaluationRecord,
    ) -> StorageResult<()>;
}

// ---------------------------------------------------------------------------
// JobService: custom, tuning, batch prediction and extract jobs
// ---------------------------------------------------------------------------

/// Lifecycle state reported for platform jobs and pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelling,
    Cancelled,
    Paused,
    Expired,
    PartiallySucceeded,
    Unspecified,
}

impl JobState {
    /// Parse a platform state string such as `JOB_STATE_SUCCEEDED` or
    /// `PIPELINE_STATE_RUNNING`. Unknown values map to `Unspecified`.
    pub fn from_platform(state: &str) -> Self {
        let name = state
            .strip_prefix("JOB_STATE_")
            .or_else(|| state.strip_prefix("PIPELINE_STATE_"))
            .unwrap_or(state);
        match name {
            "QUEUED" => Self::Queued,
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELLING" => Self::Cancelling,
            "CANCELLED" => Self::Cancelled,
            "PAUSED" => Self::Paused,
            "EXPIRED" => Self::Expired,
            "PARTIALLY_SUCCEEDED" => Self::PartiallySucceeded,
            _ => Self::Unspecified,
        }
    }

    /// Whether the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded
                | Self::Failed
                | Self::Cancelled
                | Self::Expired
                | Self::PartiallySucceeded
        )
    }
}

/// One completed hyperparameter tuning trial, as reported by the platform.
///
/// Values are raw: the domain layer validates them before selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_id: String,
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Values of the final measurement, one per study metric
    pub final_metric_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInputConfig {
    pub instances_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bigquery_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_source: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutputConfig {
    pub predictions_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bigquery_destination_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcs_destination_prefix: Option<String>,
}

/// Request to create a batch prediction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPredictionJobRequest {
    pub display_name: String,
    /// Resource name of the model used for prediction
    pub model: String,
    pub input_config: BatchInputConfig,
    pub output_config: BatchOutputConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_config: Option<serde_json::Value>,
    pub machine_type: String,
    pub starting_replica_count: u32,
    pub max_replica_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_monitoring_config: Option<serde_json::Value>,
}

/// Request to export a warehouse table to object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractTableRequest {
    /// Project billed for the extract job
    pub project: String,
    /// Warehouse location the job runs in
    pub location: String,
    /// Fully qualified `project.dataset.table`
    pub source_table: String,
    pub destination_uri: String,
}

/// Managed training and prediction jobs.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Base output directory (`gs://...`) of a finished custom job.
    async fn custom_job_output_dir(&self, job_name: &str) -> StorageResult<String>;

    /// Trials of a finished hyperparameter tuning job, in reported order.
    async fn tuning_job_trials(&self, job_name: &str) -> StorageResult<Vec<TrialRecord>>;

    /// Create a batch prediction job, returning its resource name.
    async fn create_batch_prediction_job(
        &self,
        request: &BatchPredictionJobRequest,
    ) -> StorageResult<String>;

    /// Current state of a batch prediction job.
    async fn get_batch_prediction_job(&self, name: &str) -> StorageResult<JobState>;

    /// Run a table extract job to completion, returning its job name.
    ///
    /// A job that finishes unsuccessfully is `StorageError::JobFailed`.
    async fn extract_table(&self, request: &ExtractTableRequest) -> StorageResult<String>;
}

// ---------------------------------------------------------------------------
// PipelineService: pipeline runs and schedules
// ---------------------------------------------------------------------------

/// Request to run a compiled pipeline template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineJobRequest {
    pub display_name: String,
    pub template_uri: String,
    /// Root directory for pipeline artifacts
    pub pipeline_root: String,
    pub parameter_values: BTreeMap<String, serde_json::Value>,
    pub enable_caching: bool,
    pub service_account: Option<String>,
}

/// Handle returned for a submitted pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineJobHandle {
    pub name: String,
    pub display_name: String,
    pub state: JobState,
}

/// Request to run a pipeline on a cron schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub display_name: String,
    pub cron: String,
    pub max_concurrent_run_count: u32,
    pub max_run_count: Option<u32>,
    pub pipeline_job: PipelineJobRequest,
}

/// Handle returned for a created schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleHandle {
    pub name: String,
    pub display_name: String,
    pub cron: String,
}

/// Pipeline orchestration service.
#[async_trait]
pub trait PipelineService: Send + Sync {
    /// Submit a pipeline run.
    async fn submit(&self, request: &PipelineJobRequest) -> StorageResult<PipelineJobHandle>;

    /// Current state of a pipeline run.
    async fn pipeline_job_state(&self, name: &str) -> StorageResult<JobState>;

    /// Create a recurring schedule for a pipeline.
    async fn create_schedule(&self, request: &ScheduleRequest) -> StorageResult<ScheduleHandle>;
}

// ---------------------------------------------------------------------------
// TemplateRegistry: compiled pipeline templates
// ---------------------------------------------------------------------------

/// Compiled pipeline template to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateUpload {
    /// File name the template is uploaded under
    pub file_name: String,
    pub content: Vec<u8>,
    pub tags: Vec<String>,
    pub description: String,
}

/// Package and version assigned to an uploaded template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub package_name: String,
    pub version: String,
}

/// Registry of compiled pipeline templates.
#[async_trait]
pub trait TemplateRegistry: Send + Sync {
    /// Upload a template, tagging the new version with every tag given.
    async fn upload_template(&self, upload: &TemplateUpload) -> StorageResult<TemplateVersion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_trims_slashes() {
        assert_eq!(join_path("gs://b/run/", "/model"), "gs://b/run/model");
        assert_eq!(join_path("gs://b/run", "metrics.json"), "gs://b/run/metrics.json");
    }

    #[test]
    fn job_state_parses_platform_names() {
        assert_eq!(
            JobState::from_platform("JOB_STATE_SUCCEEDED"),
            JobState::Succeeded
        );
        assert_eq!(
            JobState::from_platform("PIPELINE_STATE_RUNNING"),
            JobState::Running
        );
        assert_eq!(JobState::from_platform("bogus"), JobState::Unspecified);
    }

    #[test]
    fn terminal_states() {
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Succeeded.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::Cancelling.is_terminal());
    }

    #[test]
    fn versioned_resource_name_appends_version() {
        let record = ModelRecord {
            display_name: "taxi".to_string(),
            resource_name: "projects/p/locations/l/models/42".to_string(),
            version_id: "3".to_string(),
            artifact_uri: "gs://b/model".to_string(),
            description: String::new(),
            serving_container_image_uri: String::new(),
            is_default_version: true,
            created_at: Utc::now(),
        };
        assert_eq!(
            record.versioned_resource_name(),
            "projects/p/locations/l/models/42@3"
        );
    }
}
