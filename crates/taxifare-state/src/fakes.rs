//! In-memory fakes for collaborator traits (testing only)
//!
//! Provides `MemoryArtifactStore`, `MemoryModelRegistry`, `MemoryJobService`,
//! `MemoryPipelineService` and `MemoryTemplateRegistry` that satisfy the
//! trait contracts without any external services.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::registry_state::RegistryState;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryArtifactStore
// ---------------------------------------------------------------------------

/// In-memory artifact store backed by a `BTreeMap<path, bytes>`.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_string(),
            })
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.contains_key(path))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .keys()
            .filter(|p| under_prefix(p, prefix))
            .cloned()
            .collect())
    }

    async fn remove_prefix(&self, prefix: &str) -> StorageResult<()> {
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|p, _| !under_prefix(p, prefix));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryModelRegistry
// ---------------------------------------------------------------------------

/// In-memory model registry.
///
/// Every model name maps to its full version history; resource names are
/// generated under `projects/<project>/locations/<location>`.
#[derive(Debug)]
pub struct MemoryModelRegistry {
    state: Mutex<RegistryState>,
    uploads: Mutex<Vec<UploadRequest>>,
}

impl MemoryModelRegistry {
    pub fn new(project: &str, location: &str) -> Self {
        Self {
            state: Mutex::new(RegistryState::new(&format!(
                "projects/{}/locations/{}",
                project, location
            ))),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Every upload request received, in call order.
    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.uploads.lock().unwrap().clone()
    }
}

impl Default for MemoryModelRegistry {
    fn default() -> Self {
        Self::new("test-project", "us-central1")
    }
}

#[async_trait]
impl ModelRegistry for MemoryModelRegistry {
    async fn list_models(&self, display_name: &str) -> StorageResult<Vec<ModelRecord>> {
        Ok(self.state.lock().unwrap().list_models(display_name))
    }

    async fn upload(&self, request: UploadRequest) -> StorageResult<ModelRecord> {
        self.uploads.lock().unwrap().push(request.clone());
        self.state.lock().unwrap().upload(request)
    }

    async fn get_model_evaluation(
        &self,
        versioned_resource_name: &str,
    ) -> StorageResult<Option<EvaluationRecord>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .evaluation(versioned_resource_name))
    }

    async fn import_model_evaluation(
        &self,
        versioned_resource_name: &str,
        evaluation: EvaluationRecord,
    ) -> StorageResult<()> {
        self.state
            .lock()
            .unwrap()
            .import_evaluation(versioned_resource_name, evaluation)
    }
}

// ---------------------------------------------------------------------------
// MemoryJobService
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct JobTables {
    custom_jobs: HashMap<String, String>,
    tuning_jobs: HashMap<String, Vec<TrialRecord>>,
    batch_requests: Vec<BatchPredictionJobRequest>,
    /// States returned by successive polls; the last one repeats.
    batch_states: VecDeque<JobState>,
    batch_polls: usize,
    extract_requests: Vec<ExtractTableRequest>,
    extract_failure: Option<String>,
}

/// In-memory job service with scripted results.
#[derive(Debug, Default)]
pub struct MemoryJobService {
    tables: Mutex<JobTables>,
}

impl MemoryJobService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a finished custom job and its base output directory.
    pub fn with_custom_job(self, name: &str, output_dir: &str) -> Self {
        self.tables
            .lock()
            .unwrap()
            .custom_jobs
            .insert(name.to_string(), output_dir.to_string());
        self
    }

    /// Register a finished tuning job and its trials.
    pub fn with_tuning_job(self, name: &str, trials: Vec<TrialRecord>) -> Self {
        self.tables
            .lock()
            .unwrap()
            .tuning_jobs
            .insert(name.to_string(), trials);
        self
    }

    /// Script the states returned by successive batch prediction polls.
    pub fn with_batch_states(self, states: Vec<JobState>) -> Self {
        self.tables.lock().unwrap().batch_states = states.into();
        self
    }

    /// Make every extract job finish unsuccessfully with `message`.
    pub fn with_extract_failure(self, message: &str) -> Self {
        self.tables.lock().unwrap().extract_failure = Some(message.to_string());
        self
    }

    /// Extract requests received, in call order.
    pub fn extract_requests(&self) -> Vec<ExtractTableRequest> {
        self.tables.lock().unwrap().extract_requests.clone()
    }

    /// Batch prediction requests received, in call order.
    pub fn batch_requests(&self) -> Vec<BatchPredictionJobRequest> {
        self.tables.lock().unwrap().batch_requests.clone()
    }

    /// Number of batch prediction polls served.
    pub fn batch_polls(&self) -> usize {
        self.tables.lock().unwrap().batch_polls
    }
}

#[async_trait]
impl JobService for MemoryJobService {
    async fn custom_job_output_dir(&self, job_name: &str) -> StorageResult<String> {
        let tables = self.tables.lock().unwrap();
        tables
            .custom_jobs
            .get(job_name)
            .cloned()
            .ok_or_else(|| StorageError::JobNotFound {
                name: job_name.to_string(),
            })
    }

    async fn tuning_job_trials(&self, job_name: &str) -> StorageResult<Vec<TrialRecord>> {
        let tables = self.tables.lock().unwrap();
        tables
            .tuning_jobs
            .get(job_name)
            .cloned()
            .ok_or_else(|| StorageError::JobNotFound {
                name: job_name.to_string(),
            })
    }

    async fn create_batch_prediction_job(
        &self,
        request: &BatchPredictionJobRequest,
    ) -> StorageResult<String> {
        let mut tables = self.tables.lock().unwrap();
        tables.batch_requests.push(request.clone());
        Ok(format!(
            "projects/test-project/locations/us-central1/batchPredictionJobs/{}",
            tables.batch_requests.len()
        ))
    }

    async fn get_batch_prediction_job(&self, _name: &str) -> StorageResult<JobState> {
        let mut tables = self.tables.lock().unwrap();
        tables.batch_polls += 1;
        let state = if tables.batch_states.len() > 1 {
            tables.batch_states.pop_front()
        } else {
            tables.batch_states.front().copied()
        };
        Ok(state.unwrap_or(JobState::Succeeded))
    }

    async fn extract_table(&self, request: &ExtractTableRequest) -> StorageResult<String> {
        let mut tables = self.tables.lock().unwrap();
        tables.extract_requests.push(request.clone());
        let name = format!(
            "{}:{}.extract_{}",
            request.project,
            request.location,
            tables.extract_requests.len()
        );
        match &tables.extract_failure {
            Some(message) => Err(StorageError::JobFailed {
                name,
                message: message.clone(),
            }),
            None => Ok(name),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryPipelineService
// ---------------------------------------------------------------------------

/// In-memory pipeline service that records every submission.
///
/// Submitted runs report `Succeeded` unless run states are scripted.
#[derive(Debug, Default)]
pub struct MemoryPipelineService {
    submitted: Mutex<Vec<PipelineJobRequest>>,
    schedules: Mutex<Vec<ScheduleRequest>>,
    /// States returned by successive polls; the last one repeats.
    run_states: Mutex<VecDeque<JobState>>,
    run_polls: Mutex<usize>,
}

impl MemoryPipelineService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the states returned by successive run state polls.
    pub fn with_run_states(self, states: Vec<JobState>) -> Self {
        *self.run_states.lock().unwrap() = states.into();
        self
    }

    /// Number of run state polls served.
    pub fn run_polls(&self) -> usize {
        *self.run_polls.lock().unwrap()
    }

    /// Submitted pipeline runs, in call order.
    pub fn submitted(&self) -> Vec<PipelineJobRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// Created schedules, in call order.
    pub fn schedules(&self) -> Vec<ScheduleRequest> {
        self.schedules.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineService for MemoryPipelineService {
    async fn submit(&self, request: &PipelineJobRequest) -> StorageResult<PipelineJobHandle> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        Ok(PipelineJobHandle {
            name: format!(
                "projects/test-project/locations/us-central1/pipelineJobs/{}",
                submitted.len()
            ),
            display_name: request.display_name.clone(),
            state: JobState::Pending,
        })
    }

    async fn pipeline_job_state(&self, name: &str) -> StorageResult<JobState> {
        let submitted = self.submitted.lock().unwrap();
        let known = name
            .rsplit('/')
            .next()
            .and_then(|id| id.parse::<usize>().ok())
            .is_some_and(|id| id >= 1 && id <= submitted.len());
        if !known {
            return Err(StorageError::JobNotFound {
                name: name.to_string(),
            });
        }
        *self.run_polls.lock().unwrap() += 1;
        let mut states = self.run_states.lock().unwrap();
        let state = if states.len() > 1 {
            states.pop_front()
        } else {
            states.front().copied()
        };
        Ok(state.unwrap_or(JobState::Succeeded))
    }

    async fn create_schedule(&self, request: &ScheduleRequest) -> StorageResult<ScheduleHandle> {
        let mut schedules = self.schedules.lock().unwrap();
        schedules.push(request.clone());
        Ok(ScheduleHandle {
            name: format!(
                "projects/test-project/locations/us-central1/schedules/{}",
                schedules.len()
            ),
            display_name: request.display_name.clone(),
            cron: request.cron.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryTemplateRegistry
// ---------------------------------------------------------------------------

/// In-memory template registry; every upload gets the next `sha256:<n>` version.
#[derive(Debug, Default)]
pub struct MemoryTemplateRegistry {
    uploads: Mutex<Vec<TemplateUpload>>,
}

impl MemoryTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads received, in call order.
    pub fn uploads(&self) -> Vec<TemplateUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl TemplateRegistry for MemoryTemplateRegistry {
    async fn upload_template(&self, upload: &TemplateUpload) -> StorageResult<TemplateVersion> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(upload.clone());
        let package_name = upload
            .file_name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(TemplateVersion {
            package_name,
            version: format!("sha256:{}", uploads.len()),
        })
    }
}
