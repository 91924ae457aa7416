//! Trait contract tests for ArtifactStore, ModelRegistry, JobService,
//! PipelineService and TemplateRegistry.
//!
//! These tests verify the behavioral contracts of the collaborator traits
//! using in-memory fakes and the filesystem backends. Any conforming
//! implementation must pass these.

use std::collections::BTreeMap;

use taxifare_state::fakes::{
    MemoryArtifactStore, MemoryJobService, MemoryModelRegistry, MemoryPipelineService,
    MemoryTemplateRegistry,
};
use taxifare_state::storage_traits::*;
use taxifare_state::{FsArtifactStore, FsJobService, FsModelRegistry, StorageError};

// ===========================================================================
// ArtifactStore contract tests
// ===========================================================================

async fn artifact_store_contract(store: &dyn ArtifactStore) {
    store
        .write("gs://bucket/job/model/saved_model.pb", b"graph")
        .await
        .unwrap();
    store
        .write("gs://bucket/job/model/variables/variables.index", b"vars")
        .await
        .unwrap();
    store
        .write("gs://bucket/job/metrics/metrics.json", b"{}")
        .await
        .unwrap();
    store
        .write("gs://bucket/job/modelling.txt", b"not under model/")
        .await
        .unwrap();

    assert_eq!(
        store.read("gs://bucket/job/model/saved_model.pb").await.unwrap(),
        b"graph"
    );
    assert!(store.exists("gs://bucket/job/metrics/metrics.json").await.unwrap());
    assert!(!store.exists("gs://bucket/job/absent").await.unwrap());

    let listed = store.list("gs://bucket/job/model").await.unwrap();
    assert_eq!(
        listed,
        vec![
            "gs://bucket/job/model/saved_model.pb".to_string(),
            "gs://bucket/job/model/variables/variables.index".to_string(),
        ]
    );

    let copied = copy_prefix(store, "gs://bucket/job/model", "gs://bucket/out/model")
        .await
        .unwrap();
    assert_eq!(copied, 2);
    assert_eq!(
        store
            .read("gs://bucket/out/model/variables/variables.index")
            .await
            .unwrap(),
        b"vars"
    );

    store.remove_prefix("gs://bucket/job/model").await.unwrap();
    assert!(store.list("gs://bucket/job/model").await.unwrap().is_empty());
    assert!(store.exists("gs://bucket/job/modelling.txt").await.unwrap());

    let err = store.read("gs://bucket/job/model/saved_model.pb").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[tokio::test]
async fn memory_artifact_store_contract() {
    artifact_store_contract(&MemoryArtifactStore::new()).await;
}

#[tokio::test]
async fn fs_artifact_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path()).unwrap();
    artifact_store_contract(&store).await;
}

// ===========================================================================
// ModelRegistry contract tests
// ===========================================================================

fn upload_request(parent: Option<String>, default: bool) -> UploadRequest {
    UploadRequest {
        display_name: "taxi-traffic-model".to_string(),
        description: "Predict price of a taxi trip.".to_string(),
        artifact_uri: "gs://bucket/model".to_string(),
        serving_container_image_uri: "prediction:latest".to_string(),
        parent_model: parent,
        is_default_version: default,
    }
}

fn evaluation(rmse: f64) -> EvaluationRecord {
    let mut metrics = BTreeMap::new();
    metrics.insert("rootMeanSquaredError".to_string(), rmse);
    EvaluationRecord {
        display_name: "evaluation".to_string(),
        metrics_schema_uri: "gs://schema/regression_metrics_1.0.0.yaml".to_string(),
        metrics,
        metadata: EvaluationMetadata {
            pipeline_job_id: "job-1".to_string(),
            evaluation_dataset_type: "gcs".to_string(),
            evaluation_dataset_path: vec!["gs://bucket/test".to_string()],
        },
    }
}

async fn model_registry_contract(registry: &dyn ModelRegistry) {
    assert!(registry
        .list_models("taxi-traffic-model")
        .await
        .unwrap()
        .is_empty());

    let first = registry.upload(upload_request(None, true)).await.unwrap();
    assert_eq!(first.version_id, "1");
    assert!(first.is_default_version);

    registry
        .import_model_evaluation(&first.versioned_resource_name(), evaluation(3.0))
        .await
        .unwrap();
    let stored = registry
        .get_model_evaluation(&first.versioned_resource_name())
        .await
        .unwrap()
        .expect("evaluation stored");
    assert_eq!(stored.metrics["rootMeanSquaredError"], 3.0);

    // Losing challenger: new version, default stays on version 1.
    let second = registry
        .upload(upload_request(Some(first.resource_name.clone()), false))
        .await
        .unwrap();
    assert_eq!(second.resource_name, first.resource_name);
    assert_eq!(second.version_id, "2");
    let listed = registry.list_models("taxi-traffic-model").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].version_id, "1");

    // Winning challenger: default moves.
    registry
        .upload(upload_request(Some(first.resource_name.clone()), true))
        .await
        .unwrap();
    let listed = registry.list_models("taxi-traffic-model").await.unwrap();
    assert_eq!(listed[0].version_id, "3");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].resource_name, first.resource_name);

    assert!(registry
        .get_model_evaluation(&listed[0].versioned_resource_name())
        .await
        .unwrap()
        .is_none());

    let err = registry
        .import_model_evaluation("projects/p/locations/l/models/none@1", evaluation(1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::ModelNotFound { .. }));
}

#[tokio::test]
async fn memory_model_registry_contract() {
    model_registry_contract(&MemoryModelRegistry::default()).await;
}

#[tokio::test]
async fn fs_model_registry_contract() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FsModelRegistry::new(dir.path().join("registry.json"), "p", "l");
    model_registry_contract(&registry).await;
}

#[tokio::test]
async fn memory_registry_records_upload_requests() {
    let registry = MemoryModelRegistry::default();
    registry.upload(upload_request(None, true)).await.unwrap();
    let uploads = registry.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].parent_model, None);
}

// ===========================================================================
// JobService contract tests
// ===========================================================================

fn extract_request() -> ExtractTableRequest {
    ExtractTableRequest {
        project: "test-project".to_string(),
        location: "US".to_string(),
        source_table: "test-project.test-dataset.test-table".to_string(),
        destination_uri: "gs://test-bucket/test-file".to_string(),
    }
}

async fn job_service_contract(jobs: &dyn JobService) {
    let err = jobs.custom_job_output_dir("missing").await.unwrap_err();
    assert!(matches!(err, StorageError::JobNotFound { .. }));
    let err = jobs.tuning_job_trials("missing").await.unwrap_err();
    assert!(matches!(err, StorageError::JobNotFound { .. }));

    let extract = jobs.extract_table(&extract_request()).await.unwrap();
    assert!(!extract.is_empty());

    let request = BatchPredictionJobRequest {
        display_name: "batch".to_string(),
        model: "projects/p/locations/l/models/1".to_string(),
        input_config: BatchInputConfig {
            instances_format: "bigquery".to_string(),
            bigquery_source: Some("bq://p.d.t".to_string()),
            gcs_source: None,
        },
        output_config: BatchOutputConfig {
            predictions_format: "bigquery".to_string(),
            bigquery_destination_prefix: Some("bq://p.d".to_string()),
            gcs_destination_prefix: None,
        },
        instance_config: None,
        machine_type: "n1-standard-2".to_string(),
        starting_replica_count: 1,
        max_replica_count: 1,
        model_monitoring_config: None,
    };
    let name = jobs.create_batch_prediction_job(&request).await.unwrap();
    assert!(jobs.get_batch_prediction_job(&name).await.unwrap().is_terminal());
}

#[tokio::test]
async fn memory_job_service_contract() {
    let jobs = MemoryJobService::new();
    job_service_contract(&jobs).await;
    assert_eq!(jobs.extract_requests(), vec![extract_request()]);
}

#[tokio::test]
async fn fs_job_service_contract() {
    let dir = tempfile::tempdir().unwrap();
    job_service_contract(&FsJobService::new(dir.path().join("jobs.json"), "p", "l")).await;
}

#[tokio::test]
async fn failed_extract_is_job_failed() {
    let jobs = MemoryJobService::new().with_extract_failure("Test exception");
    let err = jobs.extract_table(&extract_request()).await.unwrap_err();
    assert!(
        matches!(err, StorageError::JobFailed { ref message, .. } if message == "Test exception")
    );
}

#[tokio::test]
async fn job_service_batch_states_advance_then_repeat() {
    let jobs = MemoryJobService::new().with_batch_states(vec![
        JobState::Pending,
        JobState::Running,
        JobState::Succeeded,
    ]);
    let name = "projects/p/locations/l/batchPredictionJobs/1";
    assert_eq!(jobs.get_batch_prediction_job(name).await.unwrap(), JobState::Pending);
    assert_eq!(jobs.get_batch_prediction_job(name).await.unwrap(), JobState::Running);
    assert_eq!(jobs.get_batch_prediction_job(name).await.unwrap(), JobState::Succeeded);
    assert_eq!(jobs.get_batch_prediction_job(name).await.unwrap(), JobState::Succeeded);
    assert_eq!(jobs.batch_polls(), 4);
}

// ===========================================================================
// PipelineService contract tests
// ===========================================================================

#[tokio::test]
async fn pipeline_service_submit_then_query() {
    let service = MemoryPipelineService::new();
    let request = PipelineJobRequest {
        display_name: "taxifare-training".to_string(),
        template_uri: "gs://bucket/training.yaml".to_string(),
        pipeline_root: "gs://bucket/root".to_string(),
        parameter_values: BTreeMap::new(),
        enable_caching: false,
        service_account: None,
    };
    let handle = service.submit(&request).await.unwrap();
    assert_eq!(handle.display_name, "taxifare-training");
    assert_eq!(
        service.pipeline_job_state(&handle.name).await.unwrap(),
        JobState::Succeeded
    );
    assert!(service.pipeline_job_state("pipelineJobs/99").await.is_err());
    assert_eq!(service.submitted(), vec![request]);
}

#[tokio::test]
async fn pipeline_service_scripted_run_states() {
    let service = MemoryPipelineService::new()
        .with_run_states(vec![JobState::Running, JobState::Failed]);
    let request = PipelineJobRequest {
        display_name: "taxifare-prediction".to_string(),
        template_uri: "gs://bucket/prediction.yaml".to_string(),
        pipeline_root: "gs://bucket/root".to_string(),
        parameter_values: BTreeMap::new(),
        enable_caching: false,
        service_account: None,
    };
    let handle = service.submit(&request).await.unwrap();
    assert_eq!(service.pipeline_job_state(&handle.name).await.unwrap(), JobState::Running);
    assert_eq!(service.pipeline_job_state(&handle.name).await.unwrap(), JobState::Failed);
    assert_eq!(service.pipeline_job_state(&handle.name).await.unwrap(), JobState::Failed);
    assert_eq!(service.run_polls(), 3);
}

// ===========================================================================
// TemplateRegistry contract tests
// ===========================================================================

#[tokio::test]
async fn template_registry_versions_each_upload() {
    let registry = MemoryTemplateRegistry::new();
    let upload = TemplateUpload {
        file_name: "training.yaml".to_string(),
        content: b"pipelineInfo: {}".to_vec(),
        tags: vec!["v1".to_string(), "latest".to_string()],
        description: "taxifare".to_string(),
    };
    let first = registry.upload_template(&upload).await.unwrap();
    let second = registry.upload_template(&upload).await.unwrap();
    assert_eq!(first.package_name, "training");
    assert_ne!(first.version, second.version);
    assert_eq!(registry.uploads()[0].tags, vec!["v1", "latest"]);
}
