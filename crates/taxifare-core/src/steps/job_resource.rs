//! `gcp_resources` documents written by platform job launchers.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpResource {
    #[serde(default, alias = "resource_type")]
    pub resource_type: String,
    #[serde(alias = "resource_uri")]
    pub resource_uri: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GcpResources {
    #[serde(default)]
    pub resources: Vec<GcpResource>,
}

impl GcpResources {
    pub fn single(resource_type: &str, resource_uri: &str) -> Self {
        Self {
            resources: vec![GcpResource {
                resource_type: resource_type.to_string(),
                resource_uri: resource_uri.to_string(),
            }],
        }
    }
}

/// Resource name of the first job listed in a `gcp_resources` document.
///
/// The URI is trimmed to start at `projects/`, dropping any API host prefix.
pub fn parse_job_resource(json: &str) -> Result<String> {
    let resources: GcpResources = serde_json::from_str(json)?;
    let uri = resources
        .resources
        .first()
        .map(|r| r.resource_uri.as_str())
        .ok_or_else(|| PipelineError::InvalidJobResource("no resources listed".to_string()))?;
    uri.find("project")
        .map(|start| uri[start..].to_string())
        .ok_or_else(|| {
            PipelineError::InvalidJobResource(format!("'{}' is not a project resource", uri))
        })
}
