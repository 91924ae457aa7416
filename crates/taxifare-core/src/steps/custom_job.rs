use taxifare_state::{copy_prefix, join_path, ArtifactStore, JobService};
use tracing::{info, Instrument};

use crate::domain::error::{PipelineError, Result};
use crate::domain::evaluation::ModelEvaluation;
use crate::obs;
use crate::steps::job_resource::parse_job_resource;

/// Collect the model and metrics a finished custom training job left in its
/// base output directory.
///
/// Copies `<base>/model/` to `model_uri`, copies `<base>/metrics/metrics.json`
/// unchanged to `metrics_uri`, then removes both source prefixes.
pub async fn get_custom_job_results(
    jobs: &dyn JobService,
    store: &dyn ArtifactStore,
    job_resource: &str,
    model_uri: &str,
    metrics_uri: &str,
) -> Result<ModelEvaluation> {
    let job_name = parse_job_resource(job_resource)?;
    let span = obs::step_span("get_custom_job_results", &job_name);

    async {
        let base = jobs.custom_job_output_dir(&job_name).await?;
        let model_dir = join_path(&base, "model");
        let metrics_dir = join_path(&base, "metrics");

        let copied = copy_prefix(store, &model_dir, model_uri).await?;
        info!("copied {} model file(s) from {} to {}", copied, model_dir, model_uri);

        let raw = store.read(&join_path(&metrics_dir, "metrics.json")).await?;
        let evaluation = ModelEvaluation::from_json_slice(&raw)?;
        for (name, value) in &evaluation.metrics {
            obs::emit_metric_read(name, *value);
        }
        store.write(metrics_uri, &raw).await?;

        store.remove_prefix(&model_dir).await?;
        store.remove_prefix(&metrics_dir).await?;
        Ok::<_, PipelineError>(evaluation)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use taxifare_state::fakes::{MemoryArtifactStore, MemoryJobService};

    const JOB: &str = "projects/p/locations/l/customJobs/42";

    #[tokio::test]
    async fn missing_metrics_fails_without_cleanup() {
        let jobs = MemoryJobService::new().with_custom_job(JOB, "gs://bucket/job");
        let store = MemoryArtifactStore::new();
        store
            .write("gs://bucket/job/model/saved_model.pb", b"pb")
            .await
            .unwrap();

        let resource = format!(r#"{{"resources": [{{"resourceUri": "{}"}}]}}"#, JOB);
        let err =
            get_custom_job_results(&jobs, &store, &resource, "gs://out/model", "gs://out/m.json")
                .await
                .unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
        assert!(store
            .exists("gs://bucket/job/model/saved_model.pb")
            .await
            .unwrap());
    }
}
