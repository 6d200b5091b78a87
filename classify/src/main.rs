use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use webcompat_ml::{ArtifactPaths, OutputFormat, Pipeline, PipelineKind, TrainConfig};

#[derive(Clone, Copy, Debug)]
enum Mode {
    Train,
    Predict,
}

impl FromStr for Mode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Self::Train),
            "predict" => Ok(Self::Predict),
            _ => Err("Could not parse a mode. {train, predict}"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "A program to train and apply web-compatibility issue classifiers.")]
struct Args {
    /// A CSV dataset with title, body, labels and target columns (target cells may be blank when predicting)
    #[arg(long)]
    data: PathBuf,

    /// {train, predict}
    #[arg(long)]
    mode: Mode,

    /// The pipeline. {invalid, needsdiagnosis}
    #[arg(long, default_value = "invalid")]
    pipeline: PipelineKind,

    /// Fraction of the labelled rows used for training; the rest drives early stopping
    #[arg(long)]
    split: Option<f64>,

    /// Maximum number of boosting rounds
    #[arg(long)]
    epochs: Option<usize>,

    /// Output format of predictions. {csv, json}
    #[arg(long = "type", default_value = "csv")]
    format: OutputFormat,

    /// The directory holding encoder and model artifacts
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// The directory to write predictions to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Seed of the train/evaluation split and of the tree sampling
    #[arg(long)]
    seed: Option<u64>,

    /// A TOML file with training parameters; flags given on the command line take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn train_config(&self) -> webcompat_ml::Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_path(path)?,
            None => TrainConfig::default(),
        };
        if let Some(split) = self.split {
            config.split_ratio = split;
        }
        if let Some(epochs) = self.epochs {
            config.gbdt.n_rounds = epochs;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.validate()?;
        Ok(config)
    }
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

    match args.mode {
        Mode::Train => {
            let config = args.train_config()?;
            info!(pipeline = %args.pipeline, ?config, "start training");
            let output = pipeline.train(&args.data, &config)?;
            println!("{}", output.report);
        }
        Mode::Predict => {
            let path = pipeline.predict(&args.data, args.format, &args.output_dir)?;
            eprintln!("Predictions written to {}", path.display());
        }
    }

    Ok(())
}
