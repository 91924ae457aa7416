//! Domain-level error taxonomy for the pipeline steps.

use taxifare_state::StorageError;

/// Which side of an arbitration a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationSide {
    Challenger,
    Champion,
}

impl std::fmt::Display for EvaluationSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Challenger => f.write_str("challenger"),
            Self::Champion => f.write_str("champion"),
        }
    }
}

/// Pipeline step errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The request is ambiguous or malformed and must be fixed upstream.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("metric '{metric}' missing from {side} evaluation")]
    MissingMetric {
        metric: String,
        side: EvaluationSide,
    },

    #[error("invalid trial: {0}")]
    InvalidTrial(String),

    #[error("no model found with name {model_name}")]
    ModelNotFound { model_name: String },

    #[error("multiple models with name {model_name} were found ({count})")]
    MultipleModels { model_name: String, count: usize },

    #[error("no evaluation recorded for model {resource_name}")]
    EvaluationNotFound { resource_name: String },

    #[error("invalid job resource: {0}")]
    InvalidJobResource(String),

    #[error("job {name} finished in state {state}")]
    JobFailed { name: String, state: String },

    #[error("invalid trigger payload: {0}")]
    InvalidPayload(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline step operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
