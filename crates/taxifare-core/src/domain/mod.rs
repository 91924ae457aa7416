//! Domain models for the taxifare pipeline steps.
//!
//! Canonical definitions for the core entities:
//! - `Trial`: one evaluated hyperparameter configuration
//! - `MetricGoal` / `MetricSpec`: study objectives
//! - `ModelEvaluation`: numeric metrics of a model version

pub mod error;
pub mod evaluation;
pub mod trial;

// Re-export main types and errors
pub use error::{EvaluationSide, PipelineError, Result};
pub use evaluation::ModelEvaluation;
pub use trial::{MetricGoal, MetricSpec, ParameterValue, Parameters, Trial};
