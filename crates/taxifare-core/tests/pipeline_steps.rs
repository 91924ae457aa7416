//! Step-level tests against the in-memory and filesystem collaborators.

use std::time::Duration;

use serde_json::json;
use taxifare_core::steps::GcpResources;
use taxifare_core::{
    get_custom_job_results, get_hyperparameter_tuning_results, lookup_model, model_batch_predict,
    BatchPredictRequest, MetricGoal, MetricSpec, ParameterValue, PipelineError,
};
use taxifare_state::fakes::{MemoryArtifactStore, MemoryJobService, MemoryModelRegistry};
use taxifare_state::{
    ArtifactStore, FsArtifactStore, JobState, ModelRegistry, TrialRecord, UploadRequest,
};
use tracing_test::traced_test;

fn resource(uri: &str) -> String {
    json!({"resources": [{"resourceType": "CustomJob", "resourceUri": uri}]}).to_string()
}

async fn register(registry: &MemoryModelRegistry, name: &str, artifact_uri: &str) -> String {
    registry
        .upload(UploadRequest {
            display_name: name.to_string(),
            description: String::new(),
            artifact_uri: artifact_uri.to_string(),
            serving_container_image_uri: "img".to_string(),
            parent_model: None,
            is_default_version: true,
        })
        .await
        .unwrap()
        .resource_name
}

// ---------------------------------------------------------------------------
// lookup_model
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_single_model_reads_training_dataset() {
    let registry = MemoryModelRegistry::default();
    let store = MemoryArtifactStore::new();
    let resource_name = register(&registry, "my-model", "gs://bucket/model").await;
    store
        .write(
            "gs://bucket/model/training_dataset.json",
            br#"{"dataFormat": "csv", "targetField": "total_fare"}"#,
        )
        .await
        .unwrap();

    let outcome = lookup_model(&registry, &store, "my-model", false).await.unwrap();
    assert_eq!(outcome.model_resource_name, resource_name);
    assert_eq!(outcome.artifact_uri, "gs://bucket/model");
    assert_eq!(outcome.training_dataset["targetField"], json!("total_fare"));
}

#[traced_test]
#[tokio::test]
async fn lookup_single_model_without_dataset_warns() {
    let registry = MemoryModelRegistry::default();
    let store = MemoryArtifactStore::new();
    register(&registry, "my-model", "gs://bucket/model").await;

    let outcome = lookup_model(&registry, &store, "my-model", true).await.unwrap();
    assert!(outcome.training_dataset.is_empty());
    assert!(logs_contain("artifact.missing"));
}

#[traced_test]
#[tokio::test]
async fn lookup_nothing_found_returns_empty_outcome() {
    let registry = MemoryModelRegistry::default();
    let store = MemoryArtifactStore::new();

    let outcome = lookup_model(&registry, &store, "my-model", false).await.unwrap();
    assert_eq!(outcome.model_resource_name, "");
    assert!(outcome.training_dataset.is_empty());
    assert!(logs_contain("No model found with name"));
}

#[tokio::test]
async fn lookup_nothing_found_can_fail() {
    let registry = MemoryModelRegistry::default();
    let store = MemoryArtifactStore::new();

    let err = lookup_model(&registry, &store, "my-model", true).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ModelNotFound { ref model_name } if model_name == "my-model"
    ));
}

#[tokio::test]
async fn lookup_multiple_models_fails() {
    let registry = MemoryModelRegistry::default();
    let store = MemoryArtifactStore::new();
    register(&registry, "my-model", "gs://bucket/a").await;
    register(&registry, "my-model", "gs://bucket/b").await;

    let err = lookup_model(&registry, &store, "my-model", false).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("multiple models with name my-model were found"));
}

// ---------------------------------------------------------------------------
// get_custom_job_results
// ---------------------------------------------------------------------------

#[tokio::test]
async fn custom_job_results_copy_read_and_clean_up() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    let job = "projects/p/locations/l/customJobs/7";
    let jobs = MemoryJobService::new().with_custom_job(job, "gs://bucket/job-7");

    store
        .write("gs://bucket/job-7/model/saved_model.pb", b"pb")
        .await
        .unwrap();
    store
        .write("gs://bucket/job-7/model/variables/variables.index", b"idx")
        .await
        .unwrap();
    let metrics = br#"{"rootMeanSquaredError": 3.2, "problemType": "regression"}"#;
    store
        .write("gs://bucket/job-7/metrics/metrics.json", metrics)
        .await
        .unwrap();

    let evaluation = get_custom_job_results(
        &jobs,
        &store,
        &resource(job),
        "gs://bucket/run/model",
        "/gcs/bucket/run/metrics.json",
    )
    .await
    .unwrap();

    assert_eq!(evaluation.metric("rootMeanSquaredError"), Some(3.2));
    assert_eq!(
        store.read("gs://bucket/run/model/variables/variables.index").await.unwrap(),
        b"idx"
    );
    assert_eq!(store.read("gs://bucket/run/metrics.json").await.unwrap(), metrics);
    assert!(store.list("gs://bucket/job-7/model").await.unwrap().is_empty());
    assert!(store.list("gs://bucket/job-7/metrics").await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// get_hyperparameter_tuning_results
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tuning_results_keep_parameter_types() {
    let job = "projects/p/locations/l/hyperparameterTuningJobs/3";
    let trial = |id: &str, lr: f64, value: f64| TrialRecord {
        trial_id: id.to_string(),
        parameters: [
            ("learning_rate".to_string(), json!(lr)),
            ("batch_size".to_string(), json!(256)),
            ("optimizer".to_string(), json!("Adam")),
        ]
        .into(),
        final_metric_values: vec![value],
    };
    let jobs = MemoryJobService::new().with_tuning_job(
        job,
        vec![trial("1", 0.1, 4.0), trial("2", 0.01, 2.5), trial("3", 0.001, 2.5)],
    );

    let best = get_hyperparameter_tuning_results(
        &jobs,
        &resource(job),
        &[MetricSpec::new("val_root_mean_squared_error", MetricGoal::Minimize)],
    )
    .await
    .unwrap();

    assert_eq!(best["learning_rate"], ParameterValue::Float(0.01));
    assert_eq!(best["batch_size"], ParameterValue::Int(256));
    assert_eq!(best["optimizer"], ParameterValue::Text("Adam".to_string()));
}

// ---------------------------------------------------------------------------
// model_batch_predict
// ---------------------------------------------------------------------------

fn batch_request(source_format: &str, source_uri: &str) -> BatchPredictRequest {
    serde_json::from_value(json!({
        "model_resource_name": "projects/p/locations/l/models/1",
        "job_display_name": "test-batch-prediction-job",
        "source_uri": source_uri,
        "destination_uri": "gs://destination-uri",
        "source_format": source_format,
        "destination_format": source_format,
        "gcp_resources": "gs://bucket/gcp_resources.json",
    }))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn batch_predict_polls_until_terminal() {
    let jobs = MemoryJobService::new().with_batch_states(vec![
        JobState::Pending,
        JobState::Running,
        JobState::Succeeded,
    ]);
    let store = MemoryArtifactStore::new();

    let name = model_batch_predict(
        &jobs,
        &store,
        &batch_request("bigquery", "bq://a.b.c"),
        Duration::from_secs(30),
    )
    .await
    .unwrap();

    assert_eq!(jobs.batch_polls(), 3);
    assert_eq!(jobs.batch_requests().len(), 1);
    assert_eq!(jobs.batch_requests()[0].machine_type, "n1-standard-2");

    let written = store.read("gs://bucket/gcp_resources.json").await.unwrap();
    let resources: GcpResources = serde_json::from_slice(&written).unwrap();
    assert_eq!(resources.resources[0].resource_type, "BatchPredictionJob");
    assert_eq!(resources.resources[0].resource_uri, name);
}

#[tokio::test]
async fn batch_predict_failed_job_is_error() {
    let jobs = MemoryJobService::new().with_batch_states(vec![JobState::Failed]);
    let store = MemoryArtifactStore::new();

    let err = model_batch_predict(
        &jobs,
        &store,
        &batch_request("jsonl", r#"["gs://source-uri"]"#),
        Duration::from_millis(1),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::JobFailed { .. }), "{:?}", err);
    assert!(store.exists("gs://bucket/gcp_resources.json").await.unwrap());
}
