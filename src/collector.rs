//! Terminal form for the thirteen patient fields, plus the same field rules
//! applied to rows read from a file.
//!
//! Numeric answers are clamped into their bounds the way a bounded number
//! control would; choice answers must be one of the listed options. Binary
//! choices become 1/0 here, the four categorical fields keep their labels.

use std::io::{BufRead, Write};

use log::warn;
use serde::Deserialize;

use crate::categories::{CHEST_PAIN, RESTING_ECG, SLOPE, THALASSEMIA};
use crate::error::{PredictorError, Result};
use crate::records::{Bounds, PatientRecord, AGE, CA, CHOL, OLDPEAK, THALACH, TRESTBPS};

/// Two-option field converted inline to its code.
#[derive(Debug, Clone, Copy)]
pub struct BinaryField {
    pub field: &'static str,
    pub options: [(&'static str, u8); 2],
}

pub const SEX: BinaryField = BinaryField {
    field: "sex",
    options: [("Male", 1), ("Female", 0)],
};

pub const FBS: BinaryField = BinaryField {
    field: "fbs",
    options: [("True", 1), ("False", 0)],
};

pub const EXANG: BinaryField = BinaryField {
    field: "exang",
    options: [("Yes", 1), ("No", 0)],
};

impl BinaryField {
    pub fn labels(&self) -> Vec<&'static str> {
        self.options.iter().map(|(label, _)| *label).collect()
    }

    pub fn code(&self, label: &str) -> Result<u8> {
        self.options
            .iter()
            .find(|(option, _)| *option == label)
            .map(|(_, code)| *code)
            .ok_or_else(|| PredictorError::UnknownCategory {
                field: self.field,
                label: label.to_string(),
            })
    }
}

fn clamp_logged<T>(field: &str, bounds: Bounds<T>, value: T) -> T
where
    T: num::Num + Copy + PartialOrd + std::fmt::Display,
{
    if bounds.contains(value) {
        return value;
    }
    let clamped = bounds.clamp(value);
    warn!(
        "{} = {} outside [{}, {}], clamped to {}",
        field, value, bounds.min, bounds.max, clamped
    );
    clamped
}

pub struct Form<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Form<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn collect(&mut self) -> Result<PatientRecord> {
        let age = self.ask_integer("age", "Age", AGE)?;
        let sex = self.ask_binary("Sex", SEX)?;
        let cp = self.ask_choice("cp", "Chest Pain Type", &CHEST_PAIN.labels())?;
        let trestbps =
            self.ask_integer("trestbps", "Resting Blood Pressure (mm Hg)", TRESTBPS)?;
        let chol = self.ask_integer("chol", "Serum Cholesterol (mg/dl)", CHOL)?;
        let fbs = self.ask_binary("Fasting Blood Sugar > 120 mg/dl", FBS)?;
        let restecg = self.ask_choice(
            "restecg",
            "Resting Electrocardiographic Results",
            &RESTING_ECG.labels(),
        )?;
        let thalach = self.ask_integer("thalach", "Maximum Heart Rate Achieved", THALACH)?;
        let exang = self.ask_binary("Exercise Induced Angina", EXANG)?;
        let oldpeak = self.ask_real("oldpeak", "ST Depression Induced by Exercise", OLDPEAK)?;
        let slope = self.ask_choice(
            "slope",
            "Slope of the Peak Exercise ST Segment",
            &SLOPE.labels(),
        )?;
        let ca = self.ask_integer("ca", "Number of Major Vessels Colored by Fluoroscopy", CA)?;
        let thal = self.ask_choice("thal", "Thalassemia", &THALASSEMIA.labels())?;

        Ok(PatientRecord {
            age,
            sex,
            cp: cp.to_string(),
            trestbps,
            chol,
            fbs,
            restecg: restecg.to_string(),
            thalach,
            exang,
            oldpeak,
            slope: slope.to_string(),
            ca,
            thal: thal.to_string(),
        })
    }

    fn read_answer(&mut self, field: &'static str) -> Result<String> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(PredictorError::InputClosed { field });
        }
        Ok(line.trim().to_string())
    }

    fn ask_integer(
        &mut self,
        field: &'static str,
        label: &str,
        bounds: Bounds<i64>,
    ) -> Result<i64> {
        loop {
            write!(self.output, "{} [{}-{}]: ", label, bounds.min, bounds.max)?;
            let answer = self.read_answer(field)?;
            if answer.is_empty() {
                return Ok(bounds.min);
            }
            match answer.parse::<i64>() {
                Ok(value) => return Ok(clamp_logged(field, bounds, value)),
                Err(_) => writeln!(self.output, "Please enter a whole number.")?,
            }
        }
    }

    fn ask_real(&mut self, field: &'static str, label: &str, bounds: Bounds<f64>) -> Result<f64> {
        loop {
            write!(
                self.output,
                "{} [{:.1}-{:.1}]: ",
                label, bounds.min, bounds.max
            )?;
            let answer = self.read_answer(field)?;
            if answer.is_empty() {
                return Ok(bounds.min);
            }
            match answer.parse::<f64>() {
                Ok(value) if value.is_finite() => return Ok(clamp_logged(field, bounds, value)),
                _ => writeln!(self.output, "Please enter a number.")?,
            }
        }
    }

    fn ask_choice(
        &mut self,
        field: &'static str,
        label: &str,
        options: &[&'static str],
    ) -> Result<&'static str> {
        loop {
            writeln!(self.output, "{}", label)?;
            for (idx, option) in options.iter().enumerate() {
                writeln!(self.output, "  {}) {}", idx + 1, option)?;
            }
            write!(self.output, "> ")?;
            let answer = self.read_answer(field)?;
            if let Some(choice) = pick_option(&answer, options) {
                return Ok(choice);
            }
            writeln!(self.output, "Please choose one of the listed options.")?;
        }
    }

    fn ask_binary(&mut self, label: &str, binary: BinaryField) -> Result<u8> {
        let choice = self.ask_choice(binary.field, label, &binary.labels())?;
        binary.code(choice)
    }
}

/// Empty picks the first option; otherwise a 1-based number or the label
/// in any case.
fn pick_option(answer: &str, options: &[&'static str]) -> Option<&'static str> {
    if answer.is_empty() {
        return options.first().copied();
    }
    if let Ok(number) = answer.parse::<usize>() {
        return number.checked_sub(1).and_then(|idx| options.get(idx)).copied();
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(answer))
        .copied()
}

/// One patient as a file row, using the same labels as the form.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientRow {
    pub age: i64,
    pub sex: String,
    pub cp: String,
    pub trestbps: i64,
    pub chol: i64,
    pub fbs: String,
    pub restecg: String,
    pub thalach: i64,
    pub exang: String,
    pub oldpeak: f64,
    pub slope: String,
    pub ca: i64,
    pub thal: String,
    #[serde(default)]
    pub target: Option<u8>,
}

impl PatientRow {
    /// `row` is the 1-based data row, used in error reports.
    pub fn into_record(self, row: usize) -> Result<PatientRecord> {
        if !self.oldpeak.is_finite() {
            return Err(PredictorError::InvalidRow {
                row,
                reason: format!("oldpeak {} is not a number", self.oldpeak),
            });
        }
        Ok(PatientRecord {
            age: clamp_logged("age", AGE, self.age),
            sex: SEX.code(&self.sex)?,
            cp: self.cp,
            trestbps: clamp_logged("trestbps", TRESTBPS, self.trestbps),
            chol: clamp_logged("chol", CHOL, self.chol),
            fbs: FBS.code(&self.fbs)?,
            restecg: self.restecg,
            thalach: clamp_logged("thalach", THALACH, self.thalach),
            exang: EXANG.code(&self.exang)?,
            oldpeak: clamp_logged("oldpeak", OLDPEAK, self.oldpeak),
            slope: self.slope,
            ca: clamp_logged("ca", CA, self.ca),
            thal: self.thal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE_ANSWERS: &str = "63\nMale\n1\n145\n233\nTrue\nNormal\n150\n2\n2.3\nDownsloping\n0\nfixed defect\n";

    fn collect_from(answers: &str) -> Result<PatientRecord> {
        let mut output = Vec::new();
        let mut form = Form::new(answers.as_bytes(), &mut output);
        form.collect()
    }

    #[test]
    fn collects_reference_patient() {
        let record = collect_from(REFERENCE_ANSWERS).unwrap();
        assert_eq!(record.age, 63);
        assert_eq!(record.sex, 1);
        assert_eq!(record.cp, "Typical Angina");
        assert_eq!(record.fbs, 1);
        assert_eq!(record.restecg, "Normal");
        assert_eq!(record.exang, 0);
        assert_eq!(record.oldpeak, 2.3);
        assert_eq!(record.slope, "Downsloping");
        assert_eq!(record.thal, "Fixed Defect");
    }

    #[test]
    fn numeric_answers_are_clamped() {
        let answers = REFERENCE_ANSWERS.replacen("63", "0", 1);
        assert_eq!(collect_from(&answers).unwrap().age, 1);

        let answers = REFERENCE_ANSWERS.replacen("63", "101", 1);
        assert_eq!(collect_from(&answers).unwrap().age, 100);

        let answers = REFERENCE_ANSWERS.replacen("63", "100", 1);
        assert_eq!(collect_from(&answers).unwrap().age, 100);

        let answers = REFERENCE_ANSWERS.replacen("2.3", "12.5", 1);
        assert_eq!(collect_from(&answers).unwrap().oldpeak, 10.0);
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let answers = format!("sixty\n{}", REFERENCE_ANSWERS.replacen("Male", "Other\n5\nfemale", 1));
        let record = collect_from(&answers).unwrap();
        assert_eq!(record.age, 63);
        assert_eq!(record.sex, 0);
    }

    #[test]
    fn empty_answers_take_defaults() {
        let record = collect_from(&"\n".repeat(13)).unwrap();
        assert_eq!(record.age, 1);
        assert_eq!(record.sex, 1);
        assert_eq!(record.cp, "Typical Angina");
        assert_eq!(record.trestbps, 50);
        assert_eq!(record.thal, "Normal");
        assert_eq!(record.oldpeak, 0.0);
    }

    #[test]
    fn closed_input_names_the_missing_field() {
        match collect_from("63\nMale\n") {
            Err(PredictorError::InputClosed { field }) => assert_eq!(field, "cp"),
            other => panic!("expected closed input, got {:?}", other),
        }
    }

    #[test]
    fn pick_option_accepts_number_or_label() {
        let options = SLOPE.labels();
        assert_eq!(pick_option("3", &options), Some("Downsloping"));
        assert_eq!(pick_option("FLAT", &options), Some("Flat"));
        assert_eq!(pick_option("0", &options), None);
        assert_eq!(pick_option("4", &options), None);
        assert_eq!(pick_option("steep", &options), None);
    }

    #[test]
    fn rows_clamp_and_convert_binaries() {
        let row = PatientRow {
            age: 120,
            sex: "Female".to_string(),
            cp: "Asymptomatic".to_string(),
            trestbps: 40,
            chol: 233,
            fbs: "False".to_string(),
            restecg: "Normal".to_string(),
            thalach: 150,
            exang: "Yes".to_string(),
            oldpeak: 1.0,
            slope: "Flat".to_string(),
            ca: 9,
            thal: "Unknown".to_string(),
            target: None,
        };
        let record = row.clone().into_record(1).unwrap();
        assert_eq!(record.age, 100);
        assert_eq!(record.trestbps, 50);
        assert_eq!(record.ca, 4);
        assert_eq!((record.sex, record.fbs, record.exang), (0, 0, 1));

        let mut bad = row;
        bad.exang = "Maybe".to_string();
        assert!(matches!(
            bad.into_record(2),
            Err(PredictorError::UnknownCategory { field: "exang", .. })
        ));
    }

    #[test]
    fn rows_reject_non_finite_oldpeak() {
        let row = PatientRow {
            age: 50,
            sex: "Male".to_string(),
            cp: "Flat".to_string(),
            trestbps: 120,
            chol: 200,
            fbs: "False".to_string(),
            restecg: "Normal".to_string(),
            thalach: 150,
            exang: "No".to_string(),
            oldpeak: f64::NAN,
            slope: "Flat".to_string(),
            ca: 0,
            thal: "Normal".to_string(),
            target: Some(0),
        };
        assert!(matches!(
            row.into_record(7),
            Err(PredictorError::InvalidRow { row: 7, .. })
        ));
    }
}
