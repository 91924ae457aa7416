use taxifare_state::JobService;
use tracing::{info, Instrument};

use crate::domain::error::{PipelineError, Result};
use crate::domain::trial::{MetricSpec, Parameters};
use crate::metrics::METRICS;
use crate::obs;
use crate::steps::job_resource::parse_job_resource;
use crate::trial_selector::{best_trial, single_goal, trials_from_records};

/// Best parameters of a finished hyperparameter tuning job.
///
/// Multi-objective studies fail before the job is fetched.
pub async fn get_hyperparameter_tuning_results(
    jobs: &dyn JobService,
    job_resource: &str,
    metric_specs: &[MetricSpec],
) -> Result<Parameters> {
    let goal = single_goal(metric_specs)?;
    let job_name = parse_job_resource(job_resource)?;
    let span = obs::step_span("get_hyperparameter_tuning_results", &job_name);

    async {
        let records = jobs.tuning_job_trials(&job_name).await?;
        let trials = trials_from_records(&records)?;
        METRICS.add_trials_scanned(trials.len() as u64);

        let best = best_trial(&trials, goal)?;
        obs::emit_trial_selected(&job_name, trials.len(), best.final_metric_value());
        for (name, value) in best.parameters() {
            info!("best {} = {}", name, value);
        }
        Ok::<_, PipelineError>(best.parameters().clone())
    }
    .instrument(span)
    .await
}
