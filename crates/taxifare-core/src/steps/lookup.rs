use serde::{Deserialize, Serialize};
use taxifare_state::{join_path, ArtifactStore, ModelRegistry, StorageError};
use tracing::{error, info, Instrument};

use crate::domain::error::{PipelineError, Result};
use crate::obs;

/// Metadata file stored next to the model artifacts.
pub const TRAINING_DATASET_INFO: &str = "training_dataset.json";

/// Outcome of [`lookup_model`].
///
/// Empty fields mean no model was found and the lookup was allowed to
/// continue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupOutcome {
    pub model_resource_name: String,
    pub artifact_uri: String,
    pub training_dataset: serde_json::Map<String, serde_json::Value>,
}

/// Find the single model registered under `model_name`.
pub async fn lookup_model(
    registry: &dyn ModelRegistry,
    store: &dyn ArtifactStore,
    model_name: &str,
    fail_on_model_not_found: bool,
) -> Result<LookupOutcome> {
    async {
        info!("listing models with display name {}", model_name);
        let models = registry.list_models(model_name).await?;
        info!("found {} model(s)", models.len());

        let model = match models.as_slice() {
            [] => {
                error!("No model found with name {}", model_name);
                if fail_on_model_not_found {
                    return Err(PipelineError::ModelNotFound {
                        model_name: model_name.to_string(),
                    });
                }
                return Ok(LookupOutcome::default());
            }
            [model] => model,
            many => {
                return Err(PipelineError::MultipleModels {
                    model_name: model_name.to_string(),
                    count: many.len(),
                })
            }
        };

        info!("model resource name: {}", model.resource_name);
        info!("model uri: {}", model.artifact_uri);

        let path = join_path(&model.artifact_uri, TRAINING_DATASET_INFO);
        let training_dataset = match store.read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(StorageError::NotFound { .. }) => {
                obs::emit_artifact_missing(&path);
                serde_json::Map::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(LookupOutcome {
            model_resource_name: model.resource_name.clone(),
            artifact_uri: model.artifact_uri.clone(),
            training_dataset,
        })
    }
    .instrument(obs::step_span("lookup_model", model_name))
    .await
}
