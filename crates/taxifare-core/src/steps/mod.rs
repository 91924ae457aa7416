//! Pipeline steps over the collaborator traits of `taxifare-state`.
//!
//! Each step is an async function taking trait objects, so the same code
//! runs against platform backends, the filesystem backends, or the
//! in-memory fakes.

pub mod batch_predict;
pub mod custom_job;
pub mod extract;
pub mod job_resource;
pub mod lookup;
pub mod template;
pub mod tuning;
pub mod upload;

pub use batch_predict::{batch_prediction_request, model_batch_predict, BatchPredictRequest};
pub use custom_job::get_custom_job_results;
pub use extract::{extract_table_to_gcs, TableReference, DEFAULT_EXTRACT_LOCATION};
pub use job_resource::{parse_job_resource, GcpResource, GcpResources};
pub use lookup::{lookup_model, LookupOutcome, TRAINING_DATASET_INFO};
pub use template::{upload_pipeline_template, TEMPLATE_DESCRIPTION};
pub use tuning::get_hyperparameter_tuning_results;
pub use upload::{
    model_uri, upload_best_model, UploadBestModelRequest, UploadOutcome,
    REGRESSION_METRICS_SCHEMA_URI,
};
