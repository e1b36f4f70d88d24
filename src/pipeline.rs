//! Mapping, scaling and classification of one submitted patient.
//!
//! The loaded artifacts are held behind `Arc`s and never mutated after load,
//! so a `Pipeline` can be cloned into as many sessions as needed.

use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::categories::map_categories;
use crate::classifier::{Classifier, RandomForest, PRESENT_CLASS};
use crate::config::Settings;
use crate::error::{PredictorError, Result};
use crate::records::{PatientRecord, FEATURE_COUNT};
use crate::scaler::StandardScaler;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub disease_present: bool,
    pub probability_present: f64,
    pub probability_absent: f64,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        if self.disease_present {
            "Yes"
        } else {
            "No"
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    scaler: Arc<StandardScaler>,
    classifier: Arc<dyn Classifier>,
}

impl Pipeline {
    pub fn new(scaler: Arc<StandardScaler>, classifier: Arc<dyn Classifier>) -> Result<Self> {
        if scaler.n_features() != FEATURE_COUNT {
            return Err(PredictorError::shape(FEATURE_COUNT, scaler.n_features()));
        }
        if classifier.n_features() != scaler.n_features() {
            return Err(PredictorError::shape(
                scaler.n_features(),
                classifier.n_features(),
            ));
        }
        Ok(Self { scaler, classifier })
    }

    pub fn load(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let scaler = StandardScaler::load(&settings.scaler_path)?;
        let classifier = RandomForest::load(&settings.model_path)?;
        info!("pipeline ready");
        Self::new(Arc::new(scaler), Arc::new(classifier))
    }

    pub fn predict(&self, record: &PatientRecord) -> Result<PredictionResult> {
        let mapped = map_categories(record)?;
        let scaled = self.scaler.transform(mapped.features())?;
        let output = self.classifier.predict(&scaled)?;
        let result = PredictionResult {
            disease_present: output.label == PRESENT_CLASS,
            probability_present: output.probability_present,
            probability_absent: output.probability_absent,
        };
        debug!("prediction {:?}", result);
        Ok(result)
    }
}

/// Terminal state of one request.
#[derive(Debug)]
pub enum Outcome {
    Completed(PredictionResult),
    Failed(PredictorError),
}

impl Outcome {
    pub fn into_result(self) -> Result<PredictionResult> {
        match self {
            Outcome::Completed(result) => Ok(result),
            Outcome::Failed(e) => Err(e),
        }
    }
}

/// Per-request lifecycle. A `Finished` request is never run again.
#[derive(Debug)]
pub enum RequestState {
    AwaitingInput,
    Finished(Outcome),
}

impl RequestState {
    pub fn submit(self, pipeline: &Pipeline, record: &PatientRecord) -> Outcome {
        match self {
            RequestState::AwaitingInput => match pipeline.predict(record) {
                Ok(result) => Outcome::Completed(result),
                Err(e) => Outcome::Failed(e),
            },
            RequestState::Finished(outcome) => outcome,
        }
    }
}

impl From<Outcome> for RequestState {
    fn from(outcome: Outcome) -> Self {
        RequestState::Finished(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierOutput;
    use crate::records::FEATURE_ORDER;

    struct FixedClassifier(ClassifierOutput);

    impl Classifier for FixedClassifier {
        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn predict(&self, features: &[f64]) -> Result<ClassifierOutput> {
            assert_eq!(features.len(), FEATURE_COUNT);
            Ok(self.0)
        }
    }

    struct NarrowClassifier;

    impl Classifier for NarrowClassifier {
        fn n_features(&self) -> usize {
            12
        }

        fn predict(&self, _: &[f64]) -> Result<ClassifierOutput> {
            unreachable!()
        }
    }

    fn identity_scaler() -> Arc<StandardScaler> {
        Arc::new(
            StandardScaler::new(
                FEATURE_ORDER.iter().map(|s| s.to_string()).collect(),
                vec![0.0; FEATURE_COUNT],
                vec![1.0; FEATURE_COUNT],
            )
            .unwrap(),
        )
    }

    fn patient(thal: &str) -> PatientRecord {
        PatientRecord {
            age: 45,
            sex: 0,
            cp: "Asymptomatic".to_string(),
            trestbps: 120,
            chol: 240,
            fbs: 0,
            restecg: "Abnormal".to_string(),
            thalach: 160,
            exang: 1,
            oldpeak: 0.4,
            slope: "Flat".to_string(),
            ca: 1,
            thal: thal.to_string(),
        }
    }

    fn present() -> ClassifierOutput {
        ClassifierOutput {
            label: 1,
            probability_present: 0.8,
            probability_absent: 0.2,
        }
    }

    #[test]
    fn predict_reports_present_class() {
        let pipeline =
            Pipeline::new(identity_scaler(), Arc::new(FixedClassifier(present()))).unwrap();
        let result = pipeline.predict(&patient("Normal")).unwrap();
        assert!(result.disease_present);
        assert_eq!(result.label(), "Yes");
        assert!((result.probability_present + result.probability_absent - 1.0).abs() < 1e-6);
    }

    #[test]
    fn classifier_width_must_match_scaler() {
        assert!(matches!(
            Pipeline::new(identity_scaler(), Arc::new(NarrowClassifier)),
            Err(PredictorError::FeatureShapeMismatch { .. })
        ));
    }

    #[test]
    fn request_moves_to_a_terminal_state() {
        let pipeline =
            Pipeline::new(identity_scaler(), Arc::new(FixedClassifier(present()))).unwrap();

        let done = RequestState::AwaitingInput.submit(&pipeline, &patient("Unknown"));
        assert!(matches!(done, Outcome::Completed(_)));
        assert!(done.into_result().unwrap().disease_present);

        let failed = RequestState::AwaitingInput.submit(&pipeline, &patient("Mild"));
        assert!(matches!(
            failed,
            Outcome::Failed(PredictorError::UnknownCategory { field: "thal", .. })
        ));

        // a finished request is not re-run
        let still_failed = RequestState::from(failed).submit(&pipeline, &patient("Normal"));
        assert!(matches!(
            still_failed.into_result(),
            Err(PredictorError::UnknownCategory { .. })
        ));
    }
}
