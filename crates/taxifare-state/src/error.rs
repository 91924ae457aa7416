//! Error types for taxifare-state

use thiserror::Error;

/// Errors returned by the collaborator traits and their backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No object stored at the logical path
    #[error("Object not found: {path}")]
    NotFound { path: String },

    /// Logical path could not be mapped onto the backend
    #[error("Invalid artifact path: {path}")]
    InvalidPath { path: String },

    /// Model resource unknown to the registry
    #[error("Model not found: {resource_name}")]
    ModelNotFound { resource_name: String },

    /// Job resource unknown to the job service
    #[error("Job not found: {name}")]
    JobNotFound { name: String },

    /// Job ran but did not complete successfully
    #[error("Job {name} failed: {message}")]
    JobFailed { name: String, message: String },

    /// Backend cannot honour the request
    #[error("Unsupported request: {0}")]
    Unsupported(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Remote service returned an error
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err.to_string())
    }
}
