//! Registry bookkeeping shared by the in-memory and filesystem registries.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::storage_traits::{EvaluationRecord, ModelRecord, StorageResult, UploadRequest};

/// Snapshot of every model version and evaluation a registry holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RegistryState {
    /// Model resource name -> versions, oldest first
    models: BTreeMap<String, Vec<ModelRecord>>,
    /// Versioned resource name -> evaluation
    evaluations: BTreeMap<String, EvaluationRecord>,
    /// Prefix for generated resource names
    #[serde(default)]
    resource_prefix: String,
}

impl RegistryState {
    pub(crate) fn new(resource_prefix: &str) -> Self {
        Self {
            resource_prefix: resource_prefix.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub(crate) fn list_models(&self, display_name: &str) -> Vec<ModelRecord> {
        self.models
            .values()
            .filter_map(|versions| versions.iter().find(|v| v.is_default_version))
            .filter(|v| v.display_name == display_name)
            .cloned()
            .collect()
    }

    pub(crate) fn upload(&mut self, request: UploadRequest) -> StorageResult<ModelRecord> {
        let resource_name = match &request.parent_model {
            Some(parent) => {
                if !self.models.contains_key(parent) {
                    return Err(StorageError::ModelNotFound {
                        resource_name: parent.clone(),
                    });
                }
                parent.clone()
            }
            None => format!("{}/models/{}", self.resource_prefix, Uuid::new_v4().simple()),
        };

        let versions = self.models.entry(resource_name.clone()).or_default();
        // The first version of a model is always its default.
        let is_default = request.is_default_version || versions.is_empty();
        if is_default {
            for v in versions.iter_mut() {
                v.is_default_version = false;
            }
        }

        let record = ModelRecord {
            display_name: request.display_name,
            resource_name,
            version_id: (versions.len() + 1).to_string(),
            artifact_uri: request.artifact_uri,
            description: request.description,
            serving_container_image_uri: request.serving_container_image_uri,
            is_default_version: is_default,
            created_at: Utc::now(),
        };
        versions.push(record.clone());
        Ok(record)
    }

    pub(crate) fn evaluation(&self, versioned_resource_name: &str) -> Option<EvaluationRecord> {
        self.evaluations.get(versioned_resource_name).cloned()
    }

    pub(crate) fn import_evaluation(
        &mut self,
        versioned_resource_name: &str,
        evaluation: EvaluationRecord,
    ) -> StorageResult<()> {
        let (resource_name, version_id) = versioned_resource_name
            .split_once('@')
            .ok_or_else(|| StorageError::ModelNotFound {
                resource_name: versioned_resource_name.to_string(),
            })?;
        let known = self
            .models
            .get(resource_name)
            .is_some_and(|versions| versions.iter().any(|v| v.version_id == version_id));
        if !known {
            return Err(StorageError::ModelNotFound {
                resource_name: versioned_resource_name.to_string(),
            });
        }
        self.evaluations
            .insert(versioned_resource_name.to_string(), evaluation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parent: Option<String>, default: bool) -> UploadRequest {
        UploadRequest {
            display_name: "taxi-traffic-model".to_string(),
            description: "fare model".to_string(),
            artifact_uri: "gs://bucket/model".to_string(),
            serving_container_image_uri: "image:latest".to_string(),
            parent_model: parent,
            is_default_version: default,
        }
    }

    #[test]
    fn first_upload_is_default_even_when_not_requested() {
        let mut state = RegistryState::new("projects/p/locations/l");
        let record = state.upload(request(None, false)).unwrap();
        assert!(record.is_default_version);
        assert_eq!(record.version_id, "1");
        assert!(record.resource_name.starts_with("projects/p/locations/l/models/"));
    }

    #[test]
    fn default_upload_moves_default_flag() {
        let mut state = RegistryState::new("projects/p/locations/l");
        let first = state.upload(request(None, true)).unwrap();
        let second = state
            .upload(request(Some(first.resource_name.clone()), true))
            .unwrap();

        let listed = state.list_models("taxi-traffic-model");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].version_id, second.version_id);
    }

    #[test]
    fn non_default_upload_keeps_existing_default() {
        let mut state = RegistryState::new("projects/p/locations/l");
        let first = state.upload(request(None, true)).unwrap();
        state
            .upload(request(Some(first.resource_name.clone()), false))
            .unwrap();

        let listed = state.list_models("taxi-traffic-model");
        assert_eq!(listed[0].version_id, "1");
        assert_eq!(state.models[&first.resource_name].len(), 2);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut state = RegistryState::new("projects/p/locations/l");
        let err = state
            .upload(request(Some("projects/p/locations/l/models/nope".to_string()), true))
            .unwrap_err();
        assert!(matches!(err, StorageError::ModelNotFound { .. }));
    }
}
