//! Best-trial selection for hyperparameter tuning.
//!
//! Scans completed [`Trial`]s for the best final metric value under a single
//! [`MetricGoal`] and returns the winning parameter assignment. Studies with
//! more than one objective are rejected before any trial is inspected.

use taxifare_state::TrialRecord;

use crate::domain::error::{PipelineError, Result};
use crate::domain::trial::{MetricGoal, MetricSpec, ParameterValue, Parameters, Trial};

const MULTI_OBJECTIVE: &str =
    "Unable to determine best parameters for multi-objective hyperparameter tuning.";

/// Resolve the single goal of a study.
///
/// Fails with [`PipelineError::Configuration`] for multi-objective studies
/// and for studies with no metric at all.
pub fn single_goal(specs: &[MetricSpec]) -> Result<MetricGoal> {
    match specs {
        [spec] => Ok(spec.goal),
        [] => Err(PipelineError::Configuration(
            "study has no metric spec".to_string(),
        )),
        _ => Err(PipelineError::Configuration(MULTI_OBJECTIVE.to_string())),
    }
}

/// The best trial under `goal`.
///
/// The scan is left to right with strict comparison, so ties keep the
/// earliest trial. An empty slice is a [`PipelineError::Configuration`].
pub fn best_trial(trials: &[Trial], goal: MetricGoal) -> Result<&Trial> {
    let (first, rest) = trials.split_first().ok_or_else(|| {
        PipelineError::Configuration("cannot select best trial from an empty set".to_string())
    })?;

    Ok(rest.iter().fold(first, |best, trial| {
        if goal.improves(trial.final_metric_value(), best.final_metric_value()) {
            trial
        } else {
            best
        }
    }))
}

/// Return the parameters of the best trial under `goal`, unmodified.
pub fn select_best(trials: &[Trial], goal: MetricGoal) -> Result<Parameters> {
    best_trial(trials, goal).map(|t| t.parameters().clone())
}

/// [`single_goal`] followed by [`select_best`].
pub fn select_best_for_study(trials: &[Trial], specs: &[MetricSpec]) -> Result<Parameters> {
    let goal = single_goal(specs)?;
    select_best(trials, goal)
}

/// Convert raw platform trial records into validated [`Trial`]s.
///
/// Each record must carry exactly one final metric value, finite, and only
/// scalar parameter values.
pub fn trials_from_records(records: &[TrialRecord]) -> Result<Vec<Trial>> {
    records
        .iter()
        .map(|record| {
            let value = match record.final_metric_values.as_slice() {
                [value] => *value,
                values => {
                    return Err(PipelineError::InvalidTrial(format!(
                        "trial {} reports {} final metric values, expected 1",
                        record.trial_id,
                        values.len()
                    )))
                }
            };
            let parameters = record
                .parameters
                .iter()
                .map(|(name, v)| -> Result<(String, ParameterValue)> {
                    Ok((name.clone(), ParameterValue::try_from(v)?))
                })
                .collect::<Result<Parameters>>()?;
            Trial::new(parameters, value)
        })
        .collect()
}
