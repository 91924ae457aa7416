//! Hyperparameter tuning trials and study metric goals.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

/// A single hyperparameter assignment.
///
/// Values keep the type they were reported with; nothing is coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            // Whole floats keep their fraction: 1.0 renders as "1.0", not "1".
            Self::Float(v) => write!(f, "{:?}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl TryFrom<&serde_json::Value> for ParameterValue {
    type Error = PipelineError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| {
                    PipelineError::InvalidTrial(format!("unrepresentable number {}", n))
                }),
            other => Err(PipelineError::InvalidTrial(format!(
                "unsupported parameter value {}",
                other
            ))),
        }
    }
}

/// Parameter name to assigned value.
pub type Parameters = BTreeMap<String, ParameterValue>;

/// Optimization direction for a study metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricGoal {
    #[serde(alias = "maximize")]
    Maximize,
    #[serde(alias = "minimize")]
    Minimize,
}

impl MetricGoal {
    /// Whether `candidate` is strictly better than `incumbent` under this goal.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }
}

impl FromStr for MetricGoal {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "maximize" => Ok(Self::Maximize),
            "minimize" => Ok(Self::Minimize),
            other => Err(PipelineError::Configuration(format!(
                "unknown metric goal '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for MetricGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maximize => f.write_str("maximize"),
            Self::Minimize => f.write_str("minimize"),
        }
    }
}

/// One objective of a tuning study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub metric_id: String,
    pub goal: MetricGoal,
}

impl MetricSpec {
    pub fn new(metric_id: &str, goal: MetricGoal) -> Self {
        Self {
            metric_id: metric_id.to_string(),
            goal,
        }
    }
}

#[derive(Deserialize)]
struct TrialFields {
    parameters: Parameters,
    final_metric_value: f64,
}

/// A completed tuning trial: its parameter assignment and objective value.
///
/// # Invariants
///
/// `final_metric_value` is always finite; `Trial::new` and deserialization
/// reject NaN and infinities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrialFields")]
pub struct Trial {
    parameters: Parameters,
    final_metric_value: f64,
}

impl Trial {
    pub fn new(parameters: Parameters, final_metric_value: f64) -> Result<Self> {
        if !final_metric_value.is_finite() {
            return Err(PipelineError::InvalidTrial(format!(
                "final metric value {} is not finite",
                final_metric_value
            )));
        }
        Ok(Self {
            parameters,
            final_metric_value,
        })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn final_metric_value(&self) -> f64 {
        self.final_metric_value
    }
}

impl TryFrom<TrialFields> for Trial {
    type Error = PipelineError;

    fn try_from(fields: TrialFields) -> Result<Self> {
        Trial::new(fields.parameters, fields.final_metric_value)
    }
}
