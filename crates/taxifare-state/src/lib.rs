//! Taxifare-State: collaborator layer for the taxifare pipeline steps
//!
//! Everything the pipeline steps need from the managed ML platform is
//! reached through the traits in [`storage_traits`]. This crate owns those
//! traits, their record types, and the backends that implement them.
//!
//! ## Layer 0 - Collaborators
//!
//! Focus: a narrow, fakeable seam between decision logic and I/O.
//!
//! ## Key Components
//!
//! - `ArtifactStore`: bytes at logical paths
//!   (`FsArtifactStore`, `MemoryArtifactStore`)
//! - `ModelRegistry`: versioned models and evaluations
//!   (`FsModelRegistry`, `MemoryModelRegistry`)
//! - `JobService`: custom, tuning, batch prediction and extract jobs
//!   (`FsJobService`, `MemoryJobService`)
//! - `PipelineService`: pipeline runs and schedules
//!   (`HttpPipelineService`, `MemoryPipelineService`)
//! - `TemplateRegistry`: compiled template uploads
//!   (`HttpTemplateRegistry`, `MemoryTemplateRegistry`)

mod error;
pub mod fakes;
pub mod fs;
pub mod http;
mod registry_state;
pub mod storage_traits;

pub use error::StorageError;
pub use fs::{FsArtifactStore, FsJobService, FsModelRegistry};
pub use http::{HttpPipelineService, HttpTemplateRegistry, PipelineApiConfig};
pub use storage_traits::{
    copy_prefix, join_path, ArtifactStore, BatchInputConfig, BatchOutputConfig,
    BatchPredictionJobRequest, EvaluationMetadata, EvaluationRecord, ExtractTableRequest,
    JobService, JobState, ModelRecord, ModelRegistry, PipelineJobHandle, PipelineJobRequest,
    PipelineService, ScheduleHandle, ScheduleRequest, StorageResult, TemplateRegistry,
    TemplateUpload, TemplateVersion, TrialRecord, UploadRequest,
};
