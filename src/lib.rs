//! Heart disease prediction from thirteen clinical attributes.
//!
//! A [`collector::Form`] gathers one [`records::PatientRecord`],
//! [`pipeline::Pipeline::predict`] maps its categorical labels to training
//! codes, standardizes the row and runs the fitted random forest.

pub mod batch;
pub mod categories;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod render;
pub mod scaler;
pub mod session;

pub use error::{PredictorError, Result};
pub use pipeline::{Pipeline, PredictionResult};
pub use records::PatientRecord;
