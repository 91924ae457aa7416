//! Batch prediction with optional training-serving skew monitoring.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use taxifare_state::{
    ArtifactStore, BatchInputConfig, BatchOutputConfig, BatchPredictionJobRequest, JobService,
    JobState,
};
use tracing::{info, Instrument};

use crate::domain::error::{PipelineError, Result};
use crate::obs;
use crate::steps::job_resource::GcpResources;

fn default_machine_type() -> String {
    "n1-standard-2".to_string()
}

fn default_replicas() -> u32 {
    1
}

/// Inputs of [`model_batch_predict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictRequest {
    /// Resource name of the model to predict with
    pub model_resource_name: String,
    pub job_display_name: String,
    /// `bq://project.dataset.table` for bigquery, otherwise a JSON array of `gs://` URIs
    pub source_uri: String,
    pub destination_uri: String,
    pub source_format: String,
    pub destination_format: String,
    #[serde(default)]
    pub instance_config: Option<Value>,
    #[serde(default = "default_machine_type")]
    pub machine_type: String,
    #[serde(default = "default_replicas")]
    pub starting_replica_count: u32,
    #[serde(default = "default_replicas")]
    pub max_replica_count: u32,
    /// Training dataset description; enables skew monitoring when present
    #[serde(default)]
    pub monitoring_training_dataset: Option<Value>,
    #[serde(default)]
    pub monitoring_alert_email_addresses: Vec<String>,
    #[serde(default)]
    pub monitoring_skew_config: Option<Value>,
    /// Where the `gcp_resources` document is written
    pub gcp_resources: String,
}

fn input_config(request: &BatchPredictRequest) -> Result<BatchInputConfig> {
    if request.source_format == "bigquery" {
        return Ok(BatchInputConfig {
            instances_format: request.source_format.clone(),
            bigquery_source: Some(request.source_uri.clone()),
            gcs_source: None,
        });
    }
    let uris: Vec<String> = serde_json::from_str(&request.source_uri).map_err(|e| {
        PipelineError::Configuration(format!(
            "source_uri for format '{}' must be a JSON array of URIs: {}",
            request.source_format, e
        ))
    })?;
    Ok(BatchInputConfig {
        instances_format: request.source_format.clone(),
        bigquery_source: None,
        gcs_source: Some(uris),
    })
}

fn output_config(request: &BatchPredictRequest) -> BatchOutputConfig {
    let bigquery = request.destination_format == "bigquery";
    BatchOutputConfig {
        predictions_format: request.destination_format.clone(),
        bigquery_destination_prefix: bigquery.then(|| request.destination_uri.clone()),
        gcs_destination_prefix: (!bigquery).then(|| request.destination_uri.clone()),
    }
}

fn monitoring_config(request: &BatchPredictRequest) -> Option<Value> {
    let dataset = request.monitoring_training_dataset.as_ref()?;
    let mut objective = json!({ "trainingDataset": dataset });
    if let Some(skew) = &request.monitoring_skew_config {
        objective["trainingPredictionSkewDetectionConfig"] = skew.clone();
    }
    let mut config = json!({ "objectiveConfigs": [objective] });
    if !request.monitoring_alert_email_addresses.is_empty() {
        config["alertConfig"] = json!({
            "emailAlertConfig": { "userEmails": request.monitoring_alert_email_addresses }
        });
    }
    Some(config)
}

/// Build the platform request for a batch prediction.
pub fn batch_prediction_request(
    request: &BatchPredictRequest,
) -> Result<BatchPredictionJobRequest> {
    Ok(BatchPredictionJobRequest {
        display_name: request.job_display_name.clone(),
        model: request.model_resource_name.clone(),
        input_config: input_config(request)?,
        output_config: output_config(request),
        instance_config: request.instance_config.clone(),
        machine_type: request.machine_type.clone(),
        starting_replica_count: request.starting_replica_count,
        max_replica_count: request.max_replica_count,
        model_monitoring_config: monitoring_config(request),
    })
}

/// Run a batch prediction job to completion.
///
/// Polls every `poll_interval` until the job is terminal. The job's
/// `gcp_resources` document is written before the final state is checked,
/// so a failed job can still be traced.
pub async fn model_batch_predict(
    jobs: &dyn JobService,
    store: &dyn ArtifactStore,
    request: &BatchPredictRequest,
    poll_interval: Duration,
) -> Result<String> {
    let job_request = batch_prediction_request(request)?;

    async {
        let name = jobs.create_batch_prediction_job(&job_request).await?;
        info!("created batch prediction job {}", name);

        let state = loop {
            let state = jobs.get_batch_prediction_job(&name).await?;
            obs::emit_job_polled(&name, &state);
            if state.is_terminal() {
                break state;
            }
            tokio::time::sleep(poll_interval).await;
        };

        let resources = GcpResources::single("BatchPredictionJob", &name);
        store
            .write(&request.gcp_resources, &serde_json::to_vec(&resources)?)
            .await?;

        if state != JobState::Succeeded {
            return Err(PipelineError::JobFailed {
                name,
                state: format!("{:?}", state),
            });
        }
        info!("batch prediction job {} succeeded", name);
        Ok(name)
    }
    .instrument(obs::step_span("model_batch_predict", &request.job_display_name))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source_format: &str, source_uri: &str) -> BatchPredictRequest {
        BatchPredictRequest {
            model_resource_name: "projects/p/locations/l/models/1".to_string(),
            job_display_name: "taxi-fare-predict-job".to_string(),
            source_uri: source_uri.to_string(),
            destination_uri: "bq://p.d".to_string(),
            source_format: source_format.to_string(),
            destination_format: source_format.to_string(),
            instance_config: None,
            machine_type: default_machine_type(),
            starting_replica_count: 1,
            max_replica_count: 1,
            monitoring_training_dataset: None,
            monitoring_alert_email_addresses: Vec::new(),
            monitoring_skew_config: None,
            gcp_resources: "gs://b/gcp_resources.json".to_string(),
        }
    }

    #[test]
    fn bigquery_source_and_destination() {
        let built = batch_prediction_request(&request("bigquery", "bq://a.b.c")).unwrap();
        assert_eq!(built.input_config.bigquery_source.as_deref(), Some("bq://a.b.c"));
        assert_eq!(built.input_config.gcs_source, None);
        assert_eq!(
            built.output_config.bigquery_destination_prefix.as_deref(),
            Some("bq://p.d")
        );
        assert_eq!(built.model_monitoring_config, None);
    }

    #[test]
    fn gcs_source_must_be_json_array() {
        let built = batch_prediction_request(&request("csv", r#"["gs://file.csv"]"#)).unwrap();
        assert_eq!(
            built.input_config.gcs_source,
            Some(vec!["gs://file.csv".to_string()])
        );
        assert!(built.output_config.gcs_destination_prefix.is_some());

        let err = batch_prediction_request(&request("jsonl", "gs://source-uri")).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn monitoring_only_with_training_dataset() {
        let mut req = request("csv", r#"["gs://file.csv"]"#);
        req.monitoring_skew_config = Some(json!({"defaultSkewThreshold": {"value": 0.001}}));
        assert_eq!(batch_prediction_request(&req).unwrap().model_monitoring_config, None);

        req.monitoring_training_dataset = Some(json!({"dataFormat": "csv", "targetField": "col"}));
        req.monitoring_alert_email_addresses = vec!["a@b.com".to_string()];
        let config = batch_prediction_request(&req)
            .unwrap()
            .model_monitoring_config
            .unwrap();
        assert_eq!(
            config["objectiveConfigs"][0]["trainingPredictionSkewDetectionConfig"]
                ["defaultSkewThreshold"]["value"],
            json!(0.001)
        );
        assert_eq!(
            config["alertConfig"]["emailAlertConfig"]["userEmails"][0],
            json!("a@b.com")
        );
    }
}
