use std::fs;
use std::path::Path;

use log::{debug, info};
use num::Float;
use serde::Deserialize;

use crate::error::{PredictorError, Result};
use crate::records::{check_feature_order, FEATURE_COUNT};

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Fitted per-feature standardization, `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

fn standardize<T: Float>(value: T, mean: T, scale: T) -> T {
    (value - mean) / scale
}

impl StandardScaler {
    pub fn new(feature_names: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        check_feature_order(&feature_names)?;
        if mean.len() != FEATURE_COUNT {
            return Err(PredictorError::shape(
                format!("{} means", FEATURE_COUNT),
                format!("{} means", mean.len()),
            ));
        }
        if scale.len() != FEATURE_COUNT {
            return Err(PredictorError::shape(
                format!("{} scales", FEATURE_COUNT),
                format!("{} scales", scale.len()),
            ));
        }
        if mean.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(PredictorError::artifact(
                "<scaler>",
                "non-finite scaler parameter",
            ));
        }

        // a constant feature was fit with zero variance; it passes through centred
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Ok(Self {
            feature_names,
            mean,
            scale,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PredictorError::artifact(path, e))?;
        let raw: ScalerArtifact =
            serde_json::from_str(&text).map_err(|e| PredictorError::artifact(path, e))?;
        let scaler = match Self::new(raw.feature_names, raw.mean, raw.scale) {
            Err(PredictorError::ArtifactLoad { reason, .. }) => {
                return Err(PredictorError::artifact(path, reason))
            }
            other => other?,
        };
        info!("loaded scaler from {:?}", path);
        Ok(scaler)
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features() {
            return Err(PredictorError::shape(self.n_features(), features.len()));
        }
        let scaled: Vec<f64> = features
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&x, (&mean, &scale))| standardize(x, mean, scale))
            .collect();
        debug!("scaled features {:?}", scaled);
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::FEATURE_ORDER;

    fn names() -> Vec<String> {
        FEATURE_ORDER.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn transform_standardizes_each_column() {
        let mut mean = vec![0.0; FEATURE_COUNT];
        let mut scale = vec![1.0; FEATURE_COUNT];
        mean[0] = 50.0;
        scale[0] = 10.0;
        mean[4] = 200.0;
        scale[4] = 0.0;
        let scaler = StandardScaler::new(names(), mean, scale).unwrap();

        let mut row = vec![1.0; FEATURE_COUNT];
        row[0] = 70.0;
        row[4] = 230.0;
        let scaled = scaler.transform(&row).unwrap();
        assert_eq!(scaled.len(), FEATURE_COUNT);
        assert!((scaled[0] - 2.0).abs() < 1e-12);
        assert!((scaled[4] - 30.0).abs() < 1e-12);
        assert!((scaled[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_width_is_a_shape_mismatch() {
        let scaler =
            StandardScaler::new(names(), vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT])
                .unwrap();
        assert!(matches!(
            scaler.transform(&[1.0; 12]),
            Err(PredictorError::FeatureShapeMismatch { .. })
        ));
        assert!(matches!(
            StandardScaler::new(names(), vec![0.0; 12], vec![1.0; FEATURE_COUNT]),
            Err(PredictorError::FeatureShapeMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let mut mean = vec![0.0; FEATURE_COUNT];
        mean[3] = f64::NAN;
        assert!(matches!(
            StandardScaler::new(names(), mean, vec![1.0; FEATURE_COUNT]),
            Err(PredictorError::ArtifactLoad { .. })
        ));
    }
}
