//! Champion/challenger model arbitration.
//!
//! Compares one named metric between a freshly trained challenger and the
//! currently registered default version (the champion) and decides whether
//! the challenger becomes the new default. Equal values keep the champion.

use serde::{Deserialize, Serialize};

use crate::domain::error::{EvaluationSide, PipelineError, Result};
use crate::domain::evaluation::ModelEvaluation;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Everything an arbitration needs, as one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationInput {
    pub challenger: ModelEvaluation,
    /// Absent when no model has been registered yet.
    pub champion: Option<ModelEvaluation>,
    /// Metric compared between the two evaluations.
    pub metric: String,
    /// `true` for error metrics such as RMSE.
    pub lower_is_better: bool,
}

impl ArbitrationInput {
    pub fn arbitrate(&self) -> Result<ArbitrationResult> {
        arbitrate(
            &self.challenger,
            self.champion.as_ref(),
            &self.metric,
            self.lower_is_better,
        )
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Challenger,
    Champion,
    /// No champion existed; nothing was compared.
    NoContest,
}

/// Outcome of an arbitration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrationResult {
    pub winner: Winner,
    /// Whether the challenger should become the default version.
    pub is_default_version: bool,
    /// Compared values, present only when a comparison happened.
    pub challenger_value: Option<f64>,
    pub champion_value: Option<f64>,
}

impl ArbitrationResult {
    fn no_contest() -> Self {
        Self {
            winner: Winner::NoContest,
            is_default_version: true,
            challenger_value: None,
            champion_value: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

fn required_metric(eval: &ModelEvaluation, metric: &str, side: EvaluationSide) -> Result<f64> {
    eval.metric(metric).ok_or_else(|| PipelineError::MissingMetric {
        metric: metric.to_string(),
        side,
    })
}

/// Decide between a challenger and an optional champion on `metric`.
///
/// Without a champion the result is [`Winner::NoContest`] and no metric is
/// read. With a champion, both evaluations must carry `metric`; the
/// challenger wins only when strictly better in the requested direction.
pub fn arbitrate(
    challenger: &ModelEvaluation,
    champion: Option<&ModelEvaluation>,
    metric: &str,
    lower_is_better: bool,
) -> Result<ArbitrationResult> {
    let Some(champion) = champion else {
        return Ok(ArbitrationResult::no_contest());
    };

    let c = required_metric(challenger, metric, EvaluationSide::Challenger)?;
    let h = required_metric(champion, metric, EvaluationSide::Champion)?;

    let challenger_wins = if lower_is_better { c < h } else { c > h };
    let winner = if challenger_wins {
        Winner::Challenger
    } else {
        Winner::Champion
    };

    Ok(ArbitrationResult {
        winner,
        is_default_version: challenger_wins,
        challenger_value: Some(c),
        champion_value: Some(h),
    })
}
