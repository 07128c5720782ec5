//! Error types for the foraging models
//!
//! Degenerate-but-valid steady states (empty clusters, zero performance) are
//! NOT errors; they are carried as values by the kernels. Everything here is
//! a fail-fast condition that should abort the model for the experiment.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ModelError
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Unified error type for model evaluation
#[derive(Debug, Error)]
pub enum ModelError {
    /// The block distribution is known, but the component has no formula for it
    #[error("Unsupported scenario for {component}: {scenario}")]
    UnsupportedScenario {
        component: &'static str,
        scenario: String,
    },

    /// The scenario descriptor string could not be parsed
    #[error("Malformed scenario specification '{input}': {reason}")]
    MalformedScenario { input: String, reason: String },

    #[error("Column '{column}' not found in {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("No data rows in {0}")]
    EmptyTable(PathBuf),

    #[error("No block clusters found in {0}")]
    NoClusters(PathBuf),

    #[error("No simulation runs found under {0}")]
    NoRuns(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid model parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Experiment index {index} out of range (batch has {count})")]
    ExperimentIndex { index: usize, count: usize },

    #[error("Unknown model '{0}'")]
    UnknownModel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unsupported(component: &'static str, scenario: impl ToString) -> Self {
        ModelError::UnsupportedScenario {
            component,
            scenario: scenario.to_string(),
        }
    }
}
