use std::io::Write;

use crate::error::Result;
use crate::pipeline::PredictionResult;
use crate::records::PatientRecord;

pub fn format_probability(probability: f64) -> String {
    format!("{:.2}", probability)
}

pub fn render_details<W: Write>(out: &mut W, record: &PatientRecord) -> Result<()> {
    writeln!(out, "Patient Details")?;
    for (field, value) in record.display_fields() {
        writeln!(out, "  {:<9} {}", field, value)?;
    }
    Ok(())
}

pub fn render_prediction<W: Write>(out: &mut W, result: &PredictionResult) -> Result<()> {
    writeln!(out, "Prediction")?;
    writeln!(out, "Heart Disease: {}", result.label())?;
    writeln!(out, "Prediction Probability")?;
    writeln!(
        out,
        "Probability of having heart disease: {}",
        format_probability(result.probability_present)
    )?;
    writeln!(
        out,
        "Probability of being healthy: {}",
        format_probability(result.probability_absent)
    )?;
    Ok(())
}
