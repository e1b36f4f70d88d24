use std::path::PathBuf;

use crate::error::{PredictorError, Result};

pub static DEFAULT_SCALER_PATH: &str = "models/scaler.json";
pub static DEFAULT_MODEL_PATH: &str = "models/classifier.json";

/// Where the two fitted artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub scaler_path: PathBuf,
    pub model_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scaler_path: PathBuf::from(DEFAULT_SCALER_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
        }
    }
}

impl Settings {
    pub fn new(scaler_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            scaler_path: scaler_path.into(),
            model_path: model_path.into(),
        }
    }

    /// Both artifacts must exist before anything is served.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.scaler_path, &self.model_path] {
            if !path.is_file() {
                return Err(PredictorError::artifact(path.clone(), "file not found"));
            }
        }
        Ok(())
    }
}
