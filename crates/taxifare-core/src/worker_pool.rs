//! Training arguments and custom job worker pool specs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::trial::{ParameterValue, Parameters};

/// Arguments handed to the training container.
pub fn training_args(
    train_data: &str,
    valid_data: &str,
    test_data: &str,
    hypertune: bool,
) -> Parameters {
    let mut args = Parameters::new();
    args.insert("train_data".to_string(), train_data.into());
    args.insert("valid_data".to_string(), valid_data.into());
    args.insert("test_data".to_string(), test_data.into());
    args.insert("hypertune".to_string(), ParameterValue::Bool(hypertune));
    args
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSpec {
    pub machine_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

/// One worker pool of a custom training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPoolSpec {
    pub machine_spec: MachineSpec,
    pub replica_count: u32,
    pub container_spec: ContainerSpec,
}

impl WorkerPoolSpec {
    /// Single-replica pool running `image_uri` on `machine_type`.
    pub fn new(machine_type: &str, image_uri: &str) -> Self {
        Self {
            machine_spec: MachineSpec {
                machine_type: machine_type.to_string(),
                accelerator_type: None,
                accelerator_count: None,
            },
            replica_count: 1,
            container_spec: ContainerSpec {
                image_uri: image_uri.to_string(),
                command: Vec::new(),
                args: Vec::new(),
                env: Vec::new(),
            },
        }
    }
}

/// Render one command-line flag: `learning_rate` becomes `--learning-rate=<v>`.
///
/// Floats always carry a fraction and booleans render as `true`/`false`.
pub fn flag(name: &str, value: &ParameterValue) -> String {
    format!("--{}={}", name.replace('_', "-"), value)
}

/// Append training args, then hyperparameters, then env vars to every pool.
///
/// Existing args and env entries stay in front of the appended ones.
pub fn with_args(
    specs: Vec<WorkerPoolSpec>,
    args: &Parameters,
    hyperparams: &Parameters,
    env: &BTreeMap<String, String>,
) -> Vec<WorkerPoolSpec> {
    specs
        .into_iter()
        .map(|mut spec| {
            let container = &mut spec.container_spec;
            container
                .args
                .extend(args.iter().chain(hyperparams).map(|(k, v)| flag(k, v)));
            container.env.extend(env.iter().map(|(name, value)| EnvVar {
                name: name.clone(),
                value: value.clone(),
            }));
            spec
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_args_keys() {
        let args = training_args("gs://t", "gs://v", "gs://x", true);
        assert_eq!(args.len(), 4);
        assert_eq!(args["hypertune"], ParameterValue::Bool(true));
        assert_eq!(args["valid_data"], ParameterValue::from("gs://v"));
    }

    #[test]
    fn args_are_kebab_case_and_appended() {
        let mut spec = WorkerPoolSpec::new("n1-standard-4", "image");
        spec.container_spec.args.push("--existing".to_string());

        let mut args = Parameters::new();
        args.insert("train_data".to_string(), "gs://t".into());
        let mut hyper = Parameters::new();
        hyper.insert("learning_rate".to_string(), ParameterValue::Float(0.01));
        hyper.insert("batch_size".to_string(), ParameterValue::Int(64));
        let mut env = BTreeMap::new();
        env.insert("AIP_MODEL_DIR".to_string(), "gs://m".to_string());

        let specs = with_args(vec![spec.clone(), spec], &args, &hyper, &env);
        assert_eq!(specs.len(), 2);
        for spec in &specs {
            assert_eq!(
                spec.container_spec.args,
                vec![
                    "--existing",
                    "--train-data=gs://t",
                    "--batch-size=64",
                    "--learning-rate=0.01",
                ]
            );
            assert_eq!(spec.container_spec.env.len(), 1);
            assert_eq!(spec.container_spec.env[0].name, "AIP_MODEL_DIR");
        }
    }

    #[test]
    fn whole_floats_and_bools_keep_their_type_in_flags() {
        assert_eq!(flag("x", &ParameterValue::Float(1.0)), "--x=1.0");
        assert_eq!(flag("x", &ParameterValue::Float(0.5)), "--x=0.5");
        assert_eq!(flag("x", &ParameterValue::Int(1)), "--x=1");
        assert_eq!(flag("hypertune", &ParameterValue::Bool(false)), "--hypertune=false");
    }

    #[test]
    fn platform_json_without_args_deserializes() {
        let spec: WorkerPoolSpec = serde_json::from_str(
            r#"{"machine_spec": {"machine_type": "n1-standard-4"}, "replica_count": 1,
                "container_spec": {"image_uri": "img"}}"#,
        )
        .unwrap();
        assert!(spec.container_spec.args.is_empty());
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json["container_spec"].get("env").is_none());
    }
}
