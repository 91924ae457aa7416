//! Compiled pipeline template publishing.

use std::path::Path;

use taxifare_state::{TemplateRegistry, TemplateUpload, TemplateVersion};
use tracing::{info, Instrument};

use crate::domain::error::{PipelineError, Result};
use crate::obs;

/// Description attached to every uploaded template.
pub const TEMPLATE_DESCRIPTION: &str = "This is Kubeflow pipeline template for taxifare.";

/// Upload the compiled template at `path` under `tags`.
///
/// Returns the package name and version the registry assigned.
pub async fn upload_pipeline_template(
    registry: &dyn TemplateRegistry,
    path: &Path,
    tags: &[String],
) -> Result<TemplateVersion> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            PipelineError::Configuration(format!(
                "template path {} has no file name",
                path.display()
            ))
        })?
        .to_string();

    async {
        let content = tokio::fs::read(path).await?;
        let upload = TemplateUpload {
            file_name: file_name.clone(),
            content,
            tags: tags.to_vec(),
            description: TEMPLATE_DESCRIPTION.to_string(),
        };
        let version = registry.upload_template(&upload).await?;
        info!(
            "uploaded template {} as {} version {}",
            file_name, version.package_name, version.version
        );
        Ok::<_, PipelineError>(version)
    }
    .instrument(obs::step_span("upload_pipeline", &file_name))
    .await
}
