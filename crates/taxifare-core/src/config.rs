//! Runtime configuration.
//!
//! [`Settings`] carries the platform coordinates shared by the trigger and
//! schedule commands, read from `VERTEX_*` environment variables.
//! [`TriggerConfig`] is the JSON document handed to the table-change
//! handler through `PIPELINE_CONFIG`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};
use crate::trigger::PipelineKind;

pub const PROJECT_ENV: &str = "VERTEX_PROJECT_ID";
pub const LOCATION_ENV: &str = "VERTEX_LOCATION";
pub const PIPELINE_ROOT_ENV: &str = "VERTEX_PIPELINE_ROOT";
pub const SERVICE_ACCOUNT_ENV: &str = "VERTEX_SA_EMAIL";
pub const BQ_LOCATION_ENV: &str = "BQ_LOCATION";
pub const PIPELINE_CONFIG_ENV: &str = "PIPELINE_CONFIG";
/// Artifact registry host that compiled pipeline templates are uploaded to.
pub const TEMPLATE_REGISTRY_ENV: &str = "KFP_TEMPLATE_AR";

/// Platform coordinates for pipeline submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub project: String,
    pub location: String,
    /// `gs://` root for pipeline artifacts
    pub pipeline_root: String,
    pub service_account: Option<String>,
    pub bq_location: Option<String>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Read settings from an explicit variable map.
    ///
    /// Project, location and pipeline root are required; empty values count
    /// as missing.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let optional = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();
        let required = |key: &str| {
            optional(key).ok_or_else(|| {
                PipelineError::Configuration(format!("environment variable {} is not set", key))
            })
        };

        Ok(Self {
            project: required(PROJECT_ENV)?,
            location: required(LOCATION_ENV)?,
            pipeline_root: required(PIPELINE_ROOT_ENV)?,
            service_account: optional(SERVICE_ACCOUNT_ENV),
            bq_location: optional(BQ_LOCATION_ENV),
        })
    }
}

/// Configuration of the table-change trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub project: String,
    pub location: String,
    pub bq_location: String,
    pub use_latest_data: bool,
    pub timestamp: String,
    pub base_output_dir: String,
    #[serde(rename = "type")]
    pub kind: PipelineKind,
    pub training_template_path: String,
    pub prediction_template_path: String,
    pub display_name: String,
    #[serde(default)]
    pub pubsub_topic_name: Option<String>,
}

impl TriggerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the config from `PIPELINE_CONFIG`.
    pub fn from_env() -> Result<Self> {
        let json = std::env::var(PIPELINE_CONFIG_ENV).map_err(|_| {
            PipelineError::Configuration(format!(
                "environment variable {} is not set",
                PIPELINE_CONFIG_ENV
            ))
        })?;
        Self::from_json(&json)
    }

    pub fn template_path(&self) -> &str {
        match self.kind {
            PipelineKind::Training => &self.training_template_path,
            PipelineKind::Prediction => &self.prediction_template_path,
        }
    }

    /// Same config, retargeted at another pipeline kind.
    pub fn with_kind(&self, kind: PipelineKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn settings_require_core_variables() {
        let err = Settings::from_vars(&vars(&[(PROJECT_ENV, "p"), (LOCATION_ENV, "l")]))
            .unwrap_err();
        assert!(err.to_string().contains(PIPELINE_ROOT_ENV));
    }

    #[test]
    fn settings_treat_empty_as_missing() {
        let settings = Settings::from_vars(&vars(&[
            (PROJECT_ENV, "p"),
            (LOCATION_ENV, "europe-west1"),
            (PIPELINE_ROOT_ENV, "gs://root"),
            (SERVICE_ACCOUNT_ENV, ""),
        ]))
        .unwrap();
        assert_eq!(settings.location, "europe-west1");
        assert_eq!(settings.service_account, None);
        assert_eq!(settings.bq_location, None);
    }

    #[test]
    fn trigger_config_parses_type_field() {
        let config = TriggerConfig::from_json(
            r#"{
                "project": "p", "location": "us-central1", "bq_location": "US",
                "use_latest_data": true, "timestamp": "", "base_output_dir": "gs://b",
                "type": "training",
                "training_template_path": "gs://b/training.yaml",
                "prediction_template_path": "gs://b/prediction.yaml",
                "display_name": "taxifare"
            }"#,
        )
        .unwrap();
        assert_eq!(config.kind, PipelineKind::Training);
        assert_eq!(config.template_path(), "gs://b/training.yaml");
        assert_eq!(
            config.with_kind(PipelineKind::Prediction).template_path(),
            "gs://b/prediction.yaml"
        );
        assert_eq!(config.pubsub_topic_name, None);
    }
}
