use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("unknown {field} category {label:?}")]
    UnknownCategory { field: &'static str, label: String },
    #[error("feature shape mismatch: expected {expected}, found {found}")]
    FeatureShapeMismatch { expected: String, found: String },
    #[error("could not load artifact {path:?}: {reason}")]
    ArtifactLoad { path: PathBuf, reason: String },
    #[error("classifier probabilities sum to {sum}, expected 1")]
    InvalidProbabilities { sum: f64 },
    #[error("input closed before {field} was entered")]
    InputClosed { field: &'static str },
    #[error("invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
    #[error("invalid output format for {path:?}")]
    OutputFormat { path: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl PredictorError {
    pub(crate) fn shape(expected: impl ToString, found: impl ToString) -> Self {
        PredictorError::FeatureShapeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PredictorError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PredictorError>;
