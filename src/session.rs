//! Interactive form session: collect, predict, render, optionally repeat.

use std::io::{BufRead, Write};

use log::debug;

use crate::collector::Form;
use crate::error::{PredictorError, Result};
use crate::pipeline::{Pipeline, RequestState};
use crate::render::{render_details, render_prediction};

/// Returns the number of patients shown. With `repeat`, input ending at the
/// first prompt after at least one patient ends the session cleanly.
pub fn run_form<R: BufRead, W: Write>(
    pipeline: &Pipeline,
    mut input: R,
    mut output: W,
    repeat: bool,
) -> Result<usize> {
    writeln!(output, "Heart Disease Prediction")?;
    let mut submitted = 0;
    loop {
        writeln!(output, "Enter the details of the patient.")?;
        let record = match Form::new(&mut input, &mut output).collect() {
            Ok(record) => record,
            Err(PredictorError::InputClosed { field: "age" }) if submitted > 0 => break,
            Err(e) => return Err(e),
        };
        render_details(&mut output, &record)?;

        let result = RequestState::AwaitingInput
            .submit(pipeline, &record)
            .into_result()?;
        render_prediction(&mut output, &result)?;
        submitted += 1;
        debug!("patient {} done", submitted);

        if !repeat {
            break;
        }
    }
    output.flush()?;
    Ok(submitted)
}
