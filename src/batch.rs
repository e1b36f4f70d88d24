//! Scoring and evaluation of patients read from a CSV file.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::ArgEnum;
use log::{debug, error, info};
use polars::prelude::*;
use polars_io::parquet::ParquetWriter;
use smartcore::metrics::{accuracy, roc_auc_score};

use crate::collector::PatientRow;
use crate::error::{PredictorError, Result};
use crate::pipeline::{Pipeline, PredictionResult};
use crate::records::PatientRecord;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, ArgEnum)]
pub enum WriteFormat {
    Csv,
    Parquet,
}

pub fn infer_format(path: &Path) -> Option<WriteFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Some(WriteFormat::Csv),
        Some(ext) if ext.eq_ignore_ascii_case("parquet") => Some(WriteFormat::Parquet),
        _ => None,
    }
}

pub async fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<PatientRow>> {
    let mut reader = ::csv::Reader::from_path(path.as_ref())?;
    let rows = reader
        .deserialize::<PatientRow>()
        .enumerate()
        .map(|(idx, row)| {
            row.map_err(|e| {
                error!("row {} unreadable: {}", idx + 1, e);
                PredictorError::InvalidRow {
                    row: idx + 1,
                    reason: e.to_string(),
                }
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("read {} rows from {:?}", rows.len(), path.as_ref());
    Ok(rows)
}

pub async fn write_csv<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub async fn write_parquet<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub struct Scored {
    pub record: PatientRecord,
    pub result: PredictionResult,
    pub target: Option<u8>,
}

/// Runs every row through the pipeline; the first failing row stops the run.
pub fn score_rows(pipeline: &Pipeline, rows: Vec<PatientRow>) -> Result<Vec<Scored>> {
    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            let row_number = idx + 1;
            let target = row.target;
            let scored = row.into_record(row_number).and_then(|record| {
                pipeline
                    .predict(&record)
                    .map(|result| Scored {
                        record,
                        result,
                        target,
                    })
            });
            scored.map_err(|e| match e {
                PredictorError::InvalidRow { .. } => e,
                other => {
                    error!("row {} failed: {}", row_number, other);
                    PredictorError::InvalidRow {
                        row: row_number,
                        reason: other.to_string(),
                    }
                }
            })
        })
        .collect()
}

pub fn scored_frame(scored: &[Scored]) -> PolarsResult<DataFrame> {
    let mut frames = scored
        .iter()
        .map(|s| s.record.details_frame())
        .collect::<PolarsResult<Vec<_>>>()?
        .into_iter();
    let mut df = match frames.next() {
        Some(first) => frames.try_fold(first, |mut acc, frame| {
            acc.vstack_mut(&frame)?;
            Ok::<_, PolarsError>(acc)
        })?,
        None => return Err(PolarsError::NoData("no scored rows".into())),
    };

    let labels: Vec<&str> = scored.iter().map(|s| s.result.label()).collect();
    let present: Vec<f64> = scored.iter().map(|s| s.result.probability_present).collect();
    let absent: Vec<f64> = scored.iter().map(|s| s.result.probability_absent).collect();
    df.with_column(Series::new("prediction", labels))?;
    df.with_column(Series::new("probability_present", present))?;
    df.with_column(Series::new("probability_absent", absent))?;
    Ok(df)
}

pub async fn score_file(
    pipeline: &Pipeline,
    input: &Path,
    output: &Path,
    format: Option<WriteFormat>,
) -> Result<usize> {
    let format = format
        .or_else(|| infer_format(output))
        .ok_or_else(|| PredictorError::OutputFormat {
            path: PathBuf::from(output),
        })?;

    let rows = read_rows(input).await?;
    let scored = score_rows(pipeline, rows)?;
    let mut df = scored_frame(&scored)?;
    debug!("{}", df.head(Some(5)));

    match format {
        WriteFormat::Csv => write_csv(output, &mut df).await?,
        WriteFormat::Parquet => write_parquet(output, &mut df).await?,
    }
    info!("wrote {} predictions to {:?}", scored.len(), output);
    Ok(scored.len())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub rows: usize,
    pub accuracy: f64,
    /// `None` when no row is predicted present.
    pub precision: Option<f64>,
    /// `None` when no row has disease present.
    pub recall: Option<f64>,
    /// Only defined when both classes occur in the targets.
    pub roc_auc: Option<f64>,
}

fn ratio(hits: usize, misses: usize) -> Option<f64> {
    match hits + misses {
        0 => None,
        total => Some(hits as f64 / total as f64),
    }
}

pub fn evaluate(scored: &[Scored]) -> Result<Evaluation> {
    if scored.is_empty() {
        return Err(PredictorError::InvalidRow {
            row: 0,
            reason: "no rows to evaluate".to_string(),
        });
    }

    let mut y_true: Vec<i32> = Vec::with_capacity(scored.len());
    for (idx, s) in scored.iter().enumerate() {
        match s.target {
            Some(target @ (0 | 1)) => y_true.push(i32::from(target)),
            other => {
                return Err(PredictorError::InvalidRow {
                    row: idx + 1,
                    reason: format!("target must be 0 or 1, found {:?}", other),
                })
            }
        }
    }
    let y_pred: Vec<i32> = scored
        .iter()
        .map(|s| i32::from(s.result.disease_present))
        .collect();

    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    for (truth, pred) in y_true.iter().zip(y_pred.iter()) {
        match (*truth, *pred) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (1, 0) => fn_ += 1,
            _ => {}
        }
    }

    let both_classes = y_true.contains(&1) && y_true.contains(&0);
    let roc_auc = if both_classes {
        let y_score: Vec<f64> = y_true.iter().map(|&y| f64::from(y)).collect();
        let y_prob: Vec<f64> = scored.iter().map(|s| s.result.probability_present).collect();
        Some(roc_auc_score(&y_score, &y_prob))
    } else {
        None
    };

    let evaluation = Evaluation {
        rows: scored.len(),
        accuracy: accuracy(&y_true, &y_pred),
        precision: ratio(tp, fp),
        recall: ratio(tp, fn_),
        roc_auc,
    };
    debug!("{:?}", evaluation);
    Ok(evaluation)
}

pub async fn evaluate_file(pipeline: &Pipeline, input: &Path) -> Result<Evaluation> {
    let rows = read_rows(input).await?;
    let scored = score_rows(pipeline, rows)?;
    evaluate(&scored)
}
