//! Filesystem backends for local runs of the pipeline steps.
//!
//! - `FsArtifactStore`: bucket paths mapped under a root directory
//! - `FsModelRegistry`: registry persisted as one JSON document
//! - `FsJobService`: job results read from a JSON job table

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

use crate::error::StorageError;
use crate::registry_state::RegistryState;
use crate::storage_traits::*;

/// Write `data` to `path` atomically: temp file in the same directory, then rename.
fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
    let dir = path.parent().ok_or_else(|| StorageError::InvalidPath {
        path: path.display().to_string(),
    })?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// FsArtifactStore
// ---------------------------------------------------------------------------

/// Artifact store rooted at a local directory.
///
/// Layout: `gs://<bucket>/<key>` and `/gcs/<bucket>/<key>` both map to
/// `<root>/<bucket>/<key>`; other paths are taken relative to `<root>`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn local_path(&self, path: &str) -> StorageResult<PathBuf> {
        let relative = path
            .strip_prefix("gs://")
            .or_else(|| path.strip_prefix("/gcs/"))
            .unwrap_or(path)
            .trim_start_matches('/');

        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if relative.as_os_str().is_empty() || escapes {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let local = self.local_path(path)?;
        tokio::fs::read(&local).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    path: path.to_string(),
                }
            } else {
                StorageError::Io(e)
            }
        })
    }

    async fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let local = self.local_path(path)?;
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&local, &data))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let local = self.local_path(path)?;
        Ok(tokio::fs::metadata(&local)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let base = self.local_path(prefix)?;
        let prefix = prefix.trim_end_matches('/');
        let is_dir = tokio::fs::metadata(&base)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut pending = vec![base.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&base) {
                    let rel = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    found.push(join_path(prefix, &rel));
                }
            }
        }

        found.sort();
        Ok(found)
    }

    async fn remove_prefix(&self, prefix: &str) -> StorageResult<()> {
        let local = self.local_path(prefix)?;
        match tokio::fs::remove_dir_all(&local).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// FsModelRegistry
// ---------------------------------------------------------------------------

/// Model registry persisted as a single JSON document.
///
/// Every mutation reloads the document, applies the change, and rewrites it
/// atomically. A process-local lock serializes mutations.
#[derive(Debug)]
pub struct FsModelRegistry {
    path: PathBuf,
    resource_prefix: String,
    lock: Mutex<()>,
}

impl FsModelRegistry {
    /// Open (or lazily create) the registry document at `path`.
    pub fn new(path: impl AsRef<Path>, project: &str, location: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            resource_prefix: format!("projects/{}/locations/{}", project, location),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> StorageResult<RegistryState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(RegistryState::new(&self.resource_prefix))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &RegistryState) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait]
impl ModelRegistry for FsModelRegistry {
    async fn list_models(&self, display_name: &str) -> StorageResult<Vec<ModelRecord>> {
        Ok(self.load().await?.list_models(display_name))
    }

    async fn upload(&self, request: UploadRequest) -> StorageResult<ModelRecord> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let record = state.upload(request)?;
        self.save(&state).await?;
        Ok(record)
    }

    async fn get_model_evaluation(
        &self,
        versioned_resource_name: &str,
    ) -> StorageResult<Option<EvaluationRecord>> {
        Ok(self.load().await?.evaluation(versioned_resource_name))
    }

    async fn import_model_evaluation(
        &self,
        versioned_resource_name: &str,
        evaluation: EvaluationRecord,
    ) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        state.import_evaluation(versioned_resource_name, evaluation)?;
        self.save(&state).await
    }
}

// ---------------------------------------------------------------------------
// FsJobService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BatchJobEntry {
    request: BatchPredictionJobRequest,
    state: JobState,
}

/// Job table document read and extended by `FsJobService`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct JobTable {
    /// Custom job name -> base output directory
    #[serde(default)]
    custom_jobs: BTreeMap<String, String>,
    /// Tuning job name -> trials in reported order
    #[serde(default)]
    tuning_jobs: BTreeMap<String, Vec<TrialRecord>>,
    #[serde(default)]
    batch_prediction_jobs: BTreeMap<String, BatchJobEntry>,
    #[serde(default)]
    extract_jobs: BTreeMap<String, ExtractTableRequest>,
}

/// Job service over a JSON job table, for replaying pipeline steps locally.
///
/// Custom and tuning jobs are looked up in the table. Batch prediction and
/// extract jobs created through it are recorded in the table and finish
/// immediately as succeeded; nothing is executed.
#[derive(Debug)]
pub struct FsJobService {
    path: PathBuf,
    resource_prefix: String,
    lock: Mutex<()>,
}

impl FsJobService {
    /// Open (or lazily create) the job table at `path`.
    pub fn new(path: impl AsRef<Path>, project: &str, location: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            resource_prefix: format!("projects/{}/locations/{}", project, location),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> StorageResult<JobTable> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(JobTable::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, table: &JobTable) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(table)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}

fn job_not_found(name: &str) -> StorageError {
    StorageError::JobNotFound {
        name: name.to_string(),
    }
}

#[async_trait]
impl JobService for FsJobService {
    async fn custom_job_output_dir(&self, job_name: &str) -> StorageResult<String> {
        self.load()
            .await?
            .custom_jobs
            .remove(job_name)
            .ok_or_else(|| job_not_found(job_name))
    }

    async fn tuning_job_trials(&self, job_name: &str) -> StorageResult<Vec<TrialRecord>> {
        self.load()
            .await?
            .tuning_jobs
            .remove(job_name)
            .ok_or_else(|| job_not_found(job_name))
    }

    async fn create_batch_prediction_job(
        &self,
        request: &BatchPredictionJobRequest,
    ) -> StorageResult<String> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;
        let name = format!(
            "{}/batchPredictionJobs/{}",
            self.resource_prefix,
            table.batch_prediction_jobs.len() + 1
        );
        table.batch_prediction_jobs.insert(
            name.clone(),
            BatchJobEntry {
                request: request.clone(),
                state: JobState::Succeeded,
            },
        );
        self.save(&table).await?;
        Ok(name)
    }

    async fn get_batch_prediction_job(&self, name: &str) -> StorageResult<JobState> {
        self.load()
            .await?
            .batch_prediction_jobs
            .get(name)
            .map(|entry| entry.state)
            .ok_or_else(|| job_not_found(name))
    }

    async fn extract_table(&self, request: &ExtractTableRequest) -> StorageResult<String> {
        let _guard = self.lock.lock().await;
        let mut table = self.load().await?;
        let name = format!(
            "{}:{}.extract_{}",
            request.project,
            request.location,
            table.extract_jobs.len() + 1
        );
        table.extract_jobs.insert(name.clone(), request.clone());
        self.save(&table).await?;
        Ok(name)
    }
}
