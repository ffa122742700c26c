//! Scorer capability
//!
//! Any outlier model that can be fitted on a batch, score a batch, and
//! round-trip through a file satisfies the monitor. Scores follow the
//! isolation convention: lower = more anomalous.

use std::path::Path;
use ndarray::Array2;

use crate::logic::features::layout::LayoutMismatchError;

/// Trait for anomaly scorers (isolation forest, test doubles, ...)
pub trait Scorer: Send {
    /// Short algorithm name for logs and artifacts
    fn name(&self) -> &'static str;

    /// Fit on rows of feature vectors
    fn fit(&mut self, samples: &Array2<f64>) -> Result<(), ScorerError>;

    /// One score per row, same order
    fn score(&self, samples: &Array2<f64>) -> Result<Vec<f64>, ScorerError>;

    /// Persist to `path`
    fn save(&self, path: &Path) -> Result<(), ScorerError>;

    /// Restore from `path`
    fn load(path: &Path) -> Result<Self, ScorerError>
    where
        Self: Sized;
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug)]
pub enum ScorerError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    /// Batch width differs from what the model was fitted on
    ShapeMismatch { expected: usize, actual: usize },
    NotFitted,
    EmptyTrainingSet,
    /// NaN or infinite input
    NonFiniteInput { row: usize },
    ChecksumMismatch { expected: String, actual: String },
    LayoutMismatch(LayoutMismatchError),
    InvalidParams(String),
}

impl std::fmt::Display for ScorerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerError::Io(e) => write!(f, "Model IO error: {}", e),
            ScorerError::Serialization(e) => write!(f, "Model serialization error: {}", e),
            ScorerError::ShapeMismatch { expected, actual } => {
                write!(f, "Shape mismatch: expected {} columns, got {}", expected, actual)
            }
            ScorerError::NotFitted => write!(f, "Model has not been fitted"),
            ScorerError::EmptyTrainingSet => write!(f, "Cannot fit on an empty training set"),
            ScorerError::NonFiniteInput { row } => write!(f, "Non-finite value in row {}", row),
            ScorerError::ChecksumMismatch { expected, actual } => {
                write!(f, "Model checksum mismatch: expected {}, got {}", expected, actual)
            }
            ScorerError::LayoutMismatch(e) => write!(f, "{}", e),
            ScorerError::InvalidParams(msg) => write!(f, "Invalid model parameters: {}", msg),
        }
    }
}

impl std::error::Error for ScorerError {}

impl From<std::io::Error> for ScorerError {
    fn from(err: std::io::Error) -> Self {
        ScorerError::Io(err)
    }
}

impl From<serde_json::Error> for ScorerError {
    fn from(err: serde_json::Error) -> Self {
        ScorerError::Serialization(err)
    }
}

impl From<LayoutMismatchError> for ScorerError {
    fn from(err: LayoutMismatchError) -> Self {
        ScorerError::LayoutMismatch(err)
    }
}
