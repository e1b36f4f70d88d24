use std::io;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::{debug, info, LevelFilter};
use sysinfo::{ProcessExt, System, SystemExt};

use heart_disease_predictor::batch::{self, WriteFormat};
use heart_disease_predictor::config::{Settings, DEFAULT_MODEL_PATH, DEFAULT_SCALER_PATH};
use heart_disease_predictor::render::format_probability;
use heart_disease_predictor::session::run_form;
use heart_disease_predictor::{Pipeline, PredictorError};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct HdpArgs {
    #[clap(long, parse(from_os_str), env = "HDP_SCALER", default_value = DEFAULT_SCALER_PATH,
    help = "Fitted scaler artifact")]
    scaler: PathBuf,
    #[clap(long, parse(from_os_str), env = "HDP_MODEL", default_value = DEFAULT_MODEL_PATH,
    help = "Fitted classifier artifact")]
    model: PathBuf,
    #[clap(short, long, global = true, parse(from_occurrences),
    help = "Verbose level")]
    verbose: usize,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enter a patient interactively and show the prediction
    Form {
        #[clap(long, help = "Keep asking for further patients until input ends")]
        repeat: bool,
    },
    /// Score every patient of a CSV file
    Batch {
        #[clap(short, long, parse(from_os_str), help = "Input CSV path")]
        input: PathBuf,
        #[clap(short, long, parse(from_os_str), help = "Output path")]
        output: PathBuf,
        #[clap(short, long, arg_enum, help = "Output format, inferred from the extension when omitted")]
        format: Option<WriteFormat>,
    },
    /// Report accuracy, precision, recall and ROC AUC on a labelled CSV file
    Evaluate {
        #[clap(short, long, parse(from_os_str), help = "Input CSV path with a target column")]
        input: PathBuf,
    },
}

fn monitor_memory() -> u64 {
    let mut system = System::new();
    match sysinfo::get_current_pid() {
        Ok(pid) => {
            system.refresh_process(pid);
            system.process(pid).map(|p| p.memory()).unwrap_or(0)
        }
        Err(_) => 0,
    }
}

fn format_ratio(ratio: Option<f64>) -> String {
    ratio
        .map(format_probability)
        .unwrap_or_else(|| "undefined".to_string())
}

async fn hdp(args: HdpArgs) -> Result<(), PredictorError> {
    let settings = Settings::new(args.scaler, args.model);
    debug!("{:?}", settings);
    let pipeline = Pipeline::load(&settings)?;

    match args.command.unwrap_or(Command::Form { repeat: false }) {
        Command::Form { repeat } => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            let shown = run_form(&pipeline, stdin.lock(), stdout.lock(), repeat)?;
            debug!("{} patients shown", shown);
        }
        Command::Batch {
            input,
            output,
            format,
        } => {
            batch::score_file(&pipeline, &input, &output, format).await?;
        }
        Command::Evaluate { input } => {
            let evaluation = batch::evaluate_file(&pipeline, &input).await?;
            println!("Rows: {}", evaluation.rows);
            println!("Accuracy: {}", format_probability(evaluation.accuracy));
            println!("Precision: {}", format_ratio(evaluation.precision));
            println!("Recall: {}", format_ratio(evaluation.recall));
            match evaluation.roc_auc {
                Some(auc) => println!("ROC AUC: {}", format_probability(auc)),
                None => println!("ROC AUC: undefined (single class)"),
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), PredictorError> {
    let args = HdpArgs::parse();

    let log_level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let env = Env::new().filter("HDP_LOG");
    let _builder = Builder::new()
        .filter(Some("heart_disease_predictor"), log_level)
        .filter(Some("hdp"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", args);

    let start_time = Instant::now();
    let start_memory = monitor_memory();

    hdp(args).await?;

    let end_memory = monitor_memory();
    info!("Time elapsed: {:?}", start_time.elapsed());
    debug!("Memory used: {} bytes", end_memory.saturating_sub(start_memory));
    Ok(())
}
