//! Taxifare Core Library
//!
//! Trial selection, champion/challenger arbitration, and the pipeline steps
//! and triggers built on them.

pub mod arbiter;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod steps;
pub mod telemetry;
pub mod trial_selector;
pub mod trigger;
pub mod worker_pool;

pub use arbiter::{arbitrate, ArbitrationInput, ArbitrationResult, Winner};

pub use config::{Settings, TriggerConfig};

pub use domain::{
    EvaluationSide, MetricGoal, MetricSpec, ModelEvaluation, ParameterValue, Parameters,
    PipelineError, Result, Trial,
};

pub use steps::{
    extract_table_to_gcs, get_custom_job_results, get_hyperparameter_tuning_results, lookup_model,
    model_batch_predict, parse_job_resource, upload_best_model, upload_pipeline_template,
    BatchPredictRequest, LookupOutcome, TableReference, UploadBestModelRequest, UploadOutcome,
};

pub use trial_selector::{
    best_trial, select_best, select_best_for_study, single_goal, trials_from_records,
};

pub use trigger::{
    convert_payload, handle_table_change, on_training_complete, schedule_pipeline,
    trigger_pipeline, trigger_pipeline_from_payload, wait_for_pipeline, PipelineKind,
    TriggerPayload,
};

pub use worker_pool::{training_args, with_args, WorkerPoolSpec};

/// Crate version, shared by every workspace member.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
