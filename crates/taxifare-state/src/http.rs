//! REST clients for the managed pipeline service and template registry.
//!
//! Submits pipeline runs and schedules, and uploads compiled templates, with
//! a caller-supplied bearer token. Token acquisition is left to the caller.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage_traits::*;

/// Connection settings for the pipeline REST API.
#[derive(Debug, Clone)]
pub struct PipelineApiConfig {
    pub project: String,
    pub location: String,
    /// Bearer token sent with every request
    pub access_token: String,
    /// Overrides `https://<location>-aiplatform.googleapis.com`
    pub endpoint: Option<String>,
}

impl PipelineApiConfig {
    fn endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        }
    }

    fn base_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}",
            self.endpoint(),
            self.project,
            self.location
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RuntimeConfig<'a> {
    gcs_output_directory: &'a str,
    parameter_values: &'a BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PipelineJobBody<'a> {
    display_name: &'a str,
    runtime_config: RuntimeConfig<'a>,
    template_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    service_account: Option<&'a str>,
}

impl<'a> PipelineJobBody<'a> {
    /// Caching is set per task inside the compiled template, which a
    /// `templateUri` submission cannot rewrite, so caching requests fail here.
    fn from_request(request: &'a PipelineJobRequest) -> StorageResult<Self> {
        if request.enable_caching {
            return Err(StorageError::Unsupported(format!(
                "pipeline {} requests caching, which the REST backend cannot set on a template URI",
                request.display_name
            )));
        }
        Ok(Self {
            display_name: &request.display_name,
            runtime_config: RuntimeConfig {
                gcs_output_directory: &request.pipeline_root,
                parameter_values: &request.parameter_values,
            },
            template_uri: &request.template_uri,
            service_account: request.service_account.as_deref(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePipelineJobRequestBody<'a> {
    parent: String,
    pipeline_job: PipelineJobBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleBody<'a> {
    display_name: &'a str,
    cron: &'a str,
    max_concurrent_run_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_run_count: Option<u32>,
    create_pipeline_job_request: CreatePipelineJobRequestBody<'a>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceResponse {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    cron: Option<String>,
}

/// `PipelineService` backed by the platform's REST API.
pub struct HttpPipelineService {
    config: PipelineApiConfig,
    http_client: reqwest::Client,
}

impl HttpPipelineService {
    pub fn new(config: PipelineApiConfig) -> StorageResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("taxifare-state/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&T>,
    ) -> StorageResult<ResourceResponse> {
        debug!(%url, "pipeline api request");
        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(&self.config.access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::Http(format!("{}: {}", status, text)));
        }
        Ok(response.json::<ResourceResponse>().await?)
    }
}

#[async_trait]
impl PipelineService for HttpPipelineService {
    async fn submit(&self, request: &PipelineJobRequest) -> StorageResult<PipelineJobHandle> {
        let url = format!("{}/pipelineJobs", self.config.base_url());
        let body = PipelineJobBody::from_request(request)?;
        let created = self
            .send(reqwest::Method::POST, &url, Some(&body))
            .await?;
        info!(job = %created.name, "pipeline job created");

        Ok(PipelineJobHandle {
            name: created.name,
            display_name: request.display_name.clone(),
            state: created
                .state
                .as_deref()
                .map(JobState::from_platform)
                .unwrap_or(JobState::Pending),
        })
    }

    async fn pipeline_job_state(&self, name: &str) -> StorageResult<JobState> {
        let url = format!("{}/v1/{}", self.config.endpoint(), name);
        let job = self.send::<()>(reqwest::Method::GET, &url, None).await?;
        Ok(job
            .state
            .as_deref()
            .map(JobState::from_platform)
            .unwrap_or(JobState::Unspecified))
    }

    async fn create_schedule(&self, request: &ScheduleRequest) -> StorageResult<ScheduleHandle> {
        let url = format!("{}/schedules", self.config.base_url());
        let body = ScheduleBody {
            display_name: &request.display_name,
            cron: &request.cron,
            max_concurrent_run_count: request.max_concurrent_run_count,
            max_run_count: request.max_run_count,
            create_pipeline_job_request: CreatePipelineJobRequestBody {
                parent: format!(
                    "projects/{}/locations/{}",
                    self.config.project, self.config.location
                ),
                pipeline_job: PipelineJobBody::from_request(&request.pipeline_job)?,
            },
        };
        let created = self
            .send(reqwest::Method::POST, &url, Some(&body))
            .await?;
        info!(schedule = %created.name, "pipeline schedule created");

        Ok(ScheduleHandle {
            name: created.name,
            display_name: if created.display_name.is_empty() {
                request.display_name.clone()
            } else {
                created.display_name
            },
            cron: created.cron.unwrap_or_else(|| request.cron.clone()),
        })
    }
}

// ---------------------------------------------------------------------------
// HttpTemplateRegistry
// ---------------------------------------------------------------------------

/// Template registry reached over HTTP (`https://<region>-kfp.pkg.dev/<project>/<repo>`).
pub struct HttpTemplateRegistry {
    host: String,
    access_token: String,
    http_client: reqwest::Client,
}

impl HttpTemplateRegistry {
    pub fn new(host: &str, access_token: &str) -> StorageResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("taxifare-state/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            http_client,
        })
    }
}

/// Parse the `<package>/<version>` body returned for an upload.
fn parse_upload_response(text: &str) -> StorageResult<TemplateVersion> {
    match text.trim().split_once('/') {
        Some((package_name, version)) if !package_name.is_empty() && !version.is_empty() => {
            Ok(TemplateVersion {
                package_name: package_name.to_string(),
                version: version.to_string(),
            })
        }
        _ => Err(StorageError::Serialization(format!(
            "unexpected template upload response: {}",
            text
        ))),
    }
}

#[async_trait]
impl TemplateRegistry for HttpTemplateRegistry {
    async fn upload_template(&self, upload: &TemplateUpload) -> StorageResult<TemplateVersion> {
        let content = reqwest::multipart::Part::bytes(upload.content.clone())
            .file_name(upload.file_name.clone());
        let mut form = reqwest::multipart::Form::new().part("content", content);
        if !upload.tags.is_empty() {
            form = form.text("tags", upload.tags.join(","));
        }

        debug!(host = %self.host, file = %upload.file_name, "template upload request");
        let response = self
            .http_client
            .post(&self.host)
            .bearer_auth(&self.access_token)
            .header("description", &upload.description)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::Http(format!("{}: {}", status, text)));
        }

        let version = parse_upload_response(&text)?;
        info!(
            package = %version.package_name,
            version = %version.version,
            "pipeline template uploaded"
        );
        Ok(version)
    }
}
