use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webcompat_ml::{
    read_records_from_path, ArtifactPaths, ClassificationReport, Pipeline, PipelineKind,
};

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate a trained classifier on labelled issues.")]
struct Args {
    /// A CSV dataset with title, body, labels and target columns
    #[arg(long)]
    data: PathBuf,

    /// The pipeline. {invalid, needsdiagnosis}
    #[arg(long, default_value = "invalid")]
    pipeline: PipelineKind,

    /// The directory holding encoder and model artifacts
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let pipeline = Pipeline::new(args.pipeline, ArtifactPaths::new(&args.artifacts));
    let predictor = pipeline.predictor()?;

    let records = read_records_from_path(&args.data, args.pipeline, true)?;
    info!(n_records = records.len(), "loaded evaluation data");

    let truth = predictor.encoders().encode_targets(&records)?;
    let pred = predictor.predict_ids(&records)?;
    let report =
        ClassificationReport::new(predictor.encoders().target().classes(), &truth, &pred)?;
    println!("{report}");

    Ok(())
}
