//! Champion/challenger upload of a freshly trained model.

use serde::{Deserialize, Serialize};
use taxifare_state::{
    ArtifactStore, EvaluationMetadata, EvaluationRecord, ModelRecord, ModelRegistry, UploadRequest,
};
use tracing::{info, Instrument};

use crate::arbiter::{arbitrate, ArbitrationResult, Winner};
use crate::domain::error::{PipelineError, Result};
use crate::domain::evaluation::ModelEvaluation;
use crate::metrics::METRICS;
use crate::obs;

pub const REGRESSION_METRICS_SCHEMA_URI: &str =
    "gs://google-cloud-aiplatform/schema/modelevaluation/regression_metrics_1.0.0.yaml";

/// Inputs of [`upload_best_model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadBestModelRequest {
    /// Display name shared by champion and challenger
    pub model_name: String,
    pub model_description: String,
    /// Challenger artifacts
    pub artifact_uri: String,
    pub serving_container_image: String,
    /// Challenger metrics JSON
    pub metrics_uri: String,
    pub eval_metric: String,
    pub eval_lower_is_better: bool,
    pub pipeline_job_id: String,
    pub test_data_uri: String,
    pub evaluation_name: String,
    /// Region used to build the model URI
    pub location: String,
}

/// Result of [`upload_best_model`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub arbitration: ArbitrationResult,
    pub model: ModelRecord,
    /// REST URI of the uploaded version
    pub model_uri: String,
}

/// REST URI of a model version.
pub fn model_uri(location: &str, versioned_resource_name: &str) -> String {
    format!(
        "https://{}-aiplatform.googleapis.com/v1/{}",
        location, versioned_resource_name
    )
}

/// Upload the challenger as a new version, making it the default only when
/// it beats the current champion on `eval_metric`.
pub async fn upload_best_model(
    registry: &dyn ModelRegistry,
    store: &dyn ArtifactStore,
    request: &UploadBestModelRequest,
) -> Result<UploadOutcome> {
    async {
        let raw = store.read(&request.metrics_uri).await?;
        let challenger = ModelEvaluation::from_json_slice(&raw)?;

        let models = registry.list_models(&request.model_name).await?;
        info!("found {} models", models.len());
        let champion = match models.as_slice() {
            [] => None,
            [model] => Some(model),
            many => {
                return Err(PipelineError::MultipleModels {
                    model_name: request.model_name.clone(),
                    count: many.len(),
                })
            }
        };

        let champion_eval = match champion {
            Some(model) => {
                let versioned = model.versioned_resource_name();
                info!(
                    "model default version {} is being challenged by new model",
                    model.version_id
                );
                let record = registry
                    .get_model_evaluation(&versioned)
                    .await?
                    .ok_or_else(|| PipelineError::EvaluationNotFound {
                        resource_name: versioned.clone(),
                    })?;
                Some(ModelEvaluation::from(&record).with_resource_name(versioned))
            }
            None => None,
        };

        let arbitration = arbitrate(
            &challenger,
            champion_eval.as_ref(),
            &request.eval_metric,
            request.eval_lower_is_better,
        )?;
        match arbitration.winner {
            Winner::Challenger => {
                info!("Challenger wins!");
                METRICS.inc_challengers_promoted();
            }
            Winner::Champion => info!("Champion wins!"),
            Winner::NoContest => {}
        }
        if arbitration.winner != Winner::NoContest {
            METRICS.inc_arbitrations();
        }
        obs::emit_arbitration(&request.model_name, &request.eval_metric, &arbitration);

        let model = registry
            .upload(UploadRequest {
                display_name: request.model_name.clone(),
                description: request.model_description.clone(),
                artifact_uri: request.artifact_uri.clone(),
                serving_container_image_uri: request.serving_container_image.clone(),
                parent_model: champion.map(|m| m.resource_name.clone()),
                is_default_version: arbitration.is_default_version,
            })
            .await?;
        let versioned = model.versioned_resource_name();
        obs::emit_model_uploaded(&versioned, model.is_default_version);

        registry
            .import_model_evaluation(
                &versioned,
                EvaluationRecord {
                    display_name: request.evaluation_name.clone(),
                    metrics_schema_uri: REGRESSION_METRICS_SCHEMA_URI.to_string(),
                    metrics: challenger.metrics.clone(),
                    metadata: EvaluationMetadata {
                        pipeline_job_id: request.pipeline_job_id.clone(),
                        evaluation_dataset_type: "gcs".to_string(),
                        evaluation_dataset_path: vec![request.test_data_uri.clone()],
                    },
                },
            )
            .await?;

        Ok(UploadOutcome {
            arbitration,
            model_uri: model_uri(&request.location, &versioned),
            model,
        })
    }
    .instrument(obs::step_span("upload_best_model", &request.model_name))
    .await
}
