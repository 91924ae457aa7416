//! Model evaluation metrics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use taxifare_state::EvaluationRecord;

use crate::domain::error::Result;

/// Numeric evaluation metrics of one model version.
///
/// `resource_name` identifies the evaluated model for logging and for the
/// registry's `parent_model`; it never affects arbitration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub metrics: BTreeMap<String, f64>,
    pub resource_name: Option<String>,
}

impl ModelEvaluation {
    pub fn new(metrics: BTreeMap<String, f64>) -> Self {
        Self {
            metrics,
            resource_name: None,
        }
    }

    pub fn with_resource_name(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = Some(resource_name.into());
        self
    }

    /// Parse a flat JSON metrics object.
    ///
    /// Numeric entries are kept. Strings, nulls and nested values (for
    /// example `"problemType": "regression"` or `"rSquared": null`) are
    /// dropped.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_slice(bytes)?;
        let metrics = raw
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|f| (k, f)))
            .collect();
        Ok(Self::new(metrics))
    }

    /// Value of a metric, if present.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

impl From<&EvaluationRecord> for ModelEvaluation {
    fn from(record: &EvaluationRecord) -> Self {
        Self::new(record.metrics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_numeric_metrics_dropped() {
        let eval = ModelEvaluation::from_json_slice(
            br#"{"problemType": "regression", "rootMeanSquaredError": 2.5, "rSquared": null, "auc": 1}"#,
        )
        .unwrap();
        assert_eq!(eval.metrics.len(), 2);
        assert_eq!(eval.metric("rootMeanSquaredError"), Some(2.5));
        assert_eq!(eval.metric("auc"), Some(1.0));
        assert_eq!(eval.metric("problemType"), None);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(ModelEvaluation::from_json_slice(b"[1, 2]").is_err());
    }
}
