//! Training-time codes for the categorical form fields.
//!
//! Each table is listed in the order the form offers its options. The codes
//! are those the classifier was fit with and are not contiguous in every
//! table (thalassemia starts at "Unknown" = 0).

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::trace;

use crate::error::{PredictorError, Result};
use crate::records::{MappedRecord, PatientRecord, FEATURE_COUNT};

pub type CodeTable = &'static [(&'static str, i32)];

#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub field: &'static str,
    pub codes: CodeTable,
}

pub const CHEST_PAIN: Category = Category {
    field: "cp",
    codes: &[
        ("Typical Angina", 0),
        ("Atypical Angina", 1),
        ("Non-anginal Pain", 2),
        ("Asymptomatic", 3),
    ],
};

pub const RESTING_ECG: Category = Category {
    field: "restecg",
    codes: &[
        ("Normal", 0),
        ("Abnormal", 1),
        ("Ventricular Hypertrophy", 2),
    ],
};

pub const SLOPE: Category = Category {
    field: "slope",
    codes: &[("Upsloping", 0), ("Flat", 1), ("Downsloping", 2)],
};

pub const THALASSEMIA: Category = Category {
    field: "thal",
    codes: &[
        ("Normal", 1),
        ("Fixed Defect", 2),
        ("Reversible Defect", 3),
        ("Unknown", 0),
    ],
};

pub const CATEGORIES: [Category; 4] = [CHEST_PAIN, RESTING_ECG, SLOPE, THALASSEMIA];

lazy_static! {
    static ref LOOKUP: HashMap<&'static str, HashMap<&'static str, i32>> = CATEGORIES
        .iter()
        .map(|category| (category.field, category.codes.iter().copied().collect()))
        .collect();
}

impl Category {
    pub fn labels(&self) -> Vec<&'static str> {
        self.codes.iter().map(|(label, _)| *label).collect()
    }

    /// Exact-match lookup; a label outside the table is an error, never a default.
    pub fn code(&self, label: &str) -> Result<i32> {
        LOOKUP
            .get(self.field)
            .and_then(|table| table.get(label))
            .copied()
            .ok_or_else(|| PredictorError::UnknownCategory {
                field: self.field,
                label: label.to_string(),
            })
    }
}

/// Replace the four categorical labels with their codes, producing the
/// numeric feature row the scaler expects.
pub fn map_categories(record: &PatientRecord) -> Result<MappedRecord> {
    let cp = CHEST_PAIN.code(&record.cp)?;
    let restecg = RESTING_ECG.code(&record.restecg)?;
    let slope = SLOPE.code(&record.slope)?;
    let thal = THALASSEMIA.code(&record.thal)?;
    trace!(
        "mapped categories cp={} restecg={} slope={} thal={}",
        cp,
        restecg,
        slope,
        thal
    );

    let features: [f64; FEATURE_COUNT] = [
        record.age as f64,
        f64::from(record.sex),
        f64::from(cp),
        record.trestbps as f64,
        record.chol as f64,
        f64::from(record.fbs),
        f64::from(restecg),
        record.thalach as f64,
        f64::from(record.exang),
        record.oldpeak,
        f64::from(slope),
        record.ca as f64,
        f64::from(thal),
    ];
    Ok(MappedRecord::new(features))
}
