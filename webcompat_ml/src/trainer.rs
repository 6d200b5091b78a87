use tracing::info;

use crate::config::TrainConfig;
use crate::dataset::Record;
use crate::encoders::EncoderSet;
use crate::errors::{Result, WebcompatError};
use crate::feature;
use crate::gbdt::{Booster, EvalSet, GbdtTrainer};
use crate::metrics::ClassificationReport;
use crate::split::{train_eval_split, Split};

/// Result of a training run.
#[derive(Clone, Debug)]
pub struct TrainOutput {
    pub booster: Booster,

    /// Metrics on the evaluation partition.
    pub report: ClassificationReport,

    pub split: Split,
}

/// Trainer of the boosted-tree classifier of one pipeline.
///
/// # Examples
///
/// ```no_run
/// use webcompat_ml::{read_records_from_path, EncoderSet, ModelTrainer, PipelineKind, TrainConfig};
///
/// let records = read_records_from_path("issues.csv", PipelineKind::Invalid, true).unwrap();
/// let encoders = EncoderSet::fit(PipelineKind::Invalid, &records, 10000).unwrap();
/// let output = ModelTrainer::new(TrainConfig::default()).train(&records, &encoders).unwrap();
/// println!("{}", output.report);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ModelTrainer {
    config: TrainConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Encodes the records, splits them and fits the ensemble with early
    /// stopping on the evaluation partition.
    ///
    /// # Errors
    ///
    /// - [`WebcompatError::InsufficientData`] when `records` is empty or a
    ///   class is absent from the evaluation partition.
    /// - [`WebcompatError::SchemaMismatch`] when a record has no known target.
    pub fn train(&self, records: &[Record], encoders: &EncoderSet) -> Result<TrainOutput> {
        self.config.validate()?;
        if records.is_empty() {
            return Err(WebcompatError::insufficient_data("the dataset is empty"));
        }
        let features = feature::encode(records, encoders)?;
        let targets = encoders.encode_targets(records)?;
        let split = train_eval_split(&targets, self.config.split_ratio, self.config.seed)?;
        info!(
            n_train = split.train.len(),
            n_eval = split.eval.len(),
            n_features = features.n_features(),
            "split dataset"
        );

        let select_targets =
            |indices: &[usize]| -> Vec<u32> { indices.iter().map(|&i| targets[i]).collect() };
        let train_x = features.select(&split.train);
        let train_y: Vec<f32> = select_targets(&split.train)
            .into_iter()
            .map(|y| y as f32)
            .collect();
        let eval_x = features.select(&split.eval);
        let eval_truth = select_targets(&split.eval);
        let eval_y: Vec<f32> = eval_truth.iter().map(|&y| y as f32).collect();

        let booster = GbdtTrainer::new(self.config.gbdt_params()).train(
            &train_x,
            &train_y,
            Some(EvalSet {
                features: &eval_x,
                labels: &eval_y,
            }),
        )?
        .with_encoder_fingerprint(encoders.fingerprint());

        let pred = booster.predict(&eval_x)?;
        let report = ClassificationReport::new(encoders.target().classes(), &eval_truth, &pred)?;
        info!("evaluation report\n{report}");
        Ok(TrainOutput {
            booster,
            report,
            split,
        })
    }
}
