//! Warehouse table export into object storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use taxifare_state::{ExtractTableRequest, JobService};
use tracing::{info, Instrument};

use crate::domain::error::{PipelineError, Result};
use crate::obs;

/// Location extract jobs run in unless told otherwise.
pub const DEFAULT_EXTRACT_LOCATION: &str = "US";

/// Warehouse table named by an upstream artifact's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableReference {
    /// Read `projectId`, `datasetId` and `tableId` from artifact metadata.
    pub fn from_metadata(metadata: &Value) -> Result<Self> {
        serde_json::from_value(metadata.clone())
            .map_err(|e| PipelineError::Configuration(format!("invalid table metadata: {}", e)))
    }

    /// `project.dataset.table`
    pub fn full_table_id(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Export `table` to `destination_uri` and wait for the job to finish.
///
/// The job is billed to the table's project. Job failures propagate.
pub async fn extract_table_to_gcs(
    jobs: &dyn JobService,
    table: &TableReference,
    destination_uri: &str,
    location: Option<&str>,
) -> Result<String> {
    let request = ExtractTableRequest {
        project: table.project_id.clone(),
        location: location.unwrap_or(DEFAULT_EXTRACT_LOCATION).to_string(),
        source_table: table.full_table_id(),
        destination_uri: destination_uri.to_string(),
    };

    async {
        let name = jobs.extract_table(&request).await?;
        info!(
            "extracted {} to {} with job {}",
            request.source_table, request.destination_uri, name
        );
        Ok::<_, PipelineError>(name)
    }
    .instrument(obs::step_span("extract_table_to_gcs", &request.source_table))
    .await
}
