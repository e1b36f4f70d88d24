use num::Num;
use polars::prelude::{DataFrame, NamedFrom, PolarsResult, Series};
use serde::Serialize;

use crate::error::{PredictorError, Result};

pub const FEATURE_COUNT: usize = 13;

/// Column order the scaler and classifier were fit on.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Inclusive range accepted by a numeric form field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: Num + Copy + PartialOrd> Bounds<T> {
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: T) -> T {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

pub const AGE: Bounds<i64> = Bounds { min: 1, max: 100 };
pub const TRESTBPS: Bounds<i64> = Bounds { min: 50, max: 200 };
pub const CHOL: Bounds<i64> = Bounds { min: 100, max: 500 };
pub const THALACH: Bounds<i64> = Bounds { min: 50, max: 220 };
pub const OLDPEAK: Bounds<f64> = Bounds { min: 0.0, max: 10.0 };
pub const CA: Bounds<i64> = Bounds { min: 0, max: 4 };

/// One patient as entered on the form. Binary fields are already 0/1,
/// the four categorical fields still hold their labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRecord {
    pub age: i64,
    pub sex: u8,
    pub cp: String,
    pub trestbps: i64,
    pub chol: i64,
    pub fbs: u8,
    pub restecg: String,
    pub thalach: i64,
    pub exang: u8,
    pub oldpeak: f64,
    pub slope: String,
    pub ca: i64,
    pub thal: String,
}

impl PatientRecord {
    pub fn display_fields(&self) -> [(&'static str, String); FEATURE_COUNT] {
        [
            ("age", self.age.to_string()),
            ("sex", self.sex.to_string()),
            ("cp", self.cp.clone()),
            ("trestbps", self.trestbps.to_string()),
            ("chol", self.chol.to_string()),
            ("fbs", self.fbs.to_string()),
            ("restecg", self.restecg.clone()),
            ("thalach", self.thalach.to_string()),
            ("exang", self.exang.to_string()),
            ("oldpeak", self.oldpeak.to_string()),
            ("slope", self.slope.clone()),
            ("ca", self.ca.to_string()),
            ("thal", self.thal.clone()),
        ]
    }

    /// One-row frame of the record as entered; batch output stacks these.
    pub fn details_frame(&self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Series::new("age", &[self.age]),
            Series::new("sex", &[i32::from(self.sex)]),
            Series::new("cp", &[self.cp.as_str()]),
            Series::new("trestbps", &[self.trestbps]),
            Series::new("chol", &[self.chol]),
            Series::new("fbs", &[i32::from(self.fbs)]),
            Series::new("restecg", &[self.restecg.as_str()]),
            Series::new("thalach", &[self.thalach]),
            Series::new("exang", &[i32::from(self.exang)]),
            Series::new("oldpeak", &[self.oldpeak]),
            Series::new("slope", &[self.slope.as_str()]),
            Series::new("ca", &[self.ca]),
            Series::new("thal", &[self.thal.as_str()]),
        ])
    }
}

/// A record with every field numeric, laid out in `FEATURE_ORDER`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedRecord {
    features: [f64; FEATURE_COUNT],
}

impl MappedRecord {
    pub(crate) fn new(features: [f64; FEATURE_COUNT]) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_ORDER
            .iter()
            .position(|feature| *feature == name)
            .map(|idx| self.features[idx])
    }
}

/// Artifacts carry the column names they were fit on; anything other than
/// the exact training order is a configuration defect.
pub fn check_feature_order<S: AsRef<str>>(names: &[S]) -> Result<()> {
    let matches = names.len() == FEATURE_COUNT
        && names
            .iter()
            .zip(FEATURE_ORDER.iter())
            .all(|(name, expected)| name.as_ref() == *expected);
    if matches {
        Ok(())
    } else {
        let found: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();
        Err(PredictorError::shape(
            FEATURE_ORDER.join(","),
            found.join(","),
        ))
    }
}
