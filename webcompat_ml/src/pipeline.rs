//! Train and predict entry points of one pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::dataset::{read_records_from_path, PipelineKind, Record};
use crate::encoders::{ArtifactPaths, EncoderSet, EncoderStore};
use crate::errors::Result;
use crate::gbdt::Booster;
use crate::output::{save_predictions, OutputFormat};
use crate::predictor::{Prediction, Predictor};

#[cfg(feature = "train")]
use crate::config::TrainConfig;
#[cfg(feature = "train")]
use crate::errors::WebcompatError;
#[cfg(feature = "train")]
use crate::trainer::{ModelTrainer, TrainOutput};

/// A pipeline bound to an artifact directory.
#[derive(Clone, Debug)]
pub struct Pipeline {
    kind: PipelineKind,
    paths: ArtifactPaths,
}

impl Pipeline {
    pub fn new(kind: PipelineKind, paths: ArtifactPaths) -> Self {
        Self { kind, paths }
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn model_path(&self) -> PathBuf {
        self.paths.model_path(self.kind)
    }

    fn store(&self) -> EncoderStore {
        EncoderStore::new(self.paths.clone(), self.kind)
    }

    /// Fits the encoders on `records` and stores them.
    ///
    /// A stored model was trained with the previous encoders, so it is removed
    /// before the new encoders are written.
    #[cfg(feature = "train")]
    pub fn build_encoders(&self, records: &[Record], max_features: usize) -> Result<EncoderSet> {
        let encoders = EncoderSet::fit(self.kind, records, max_features)?;
        self.remove_model()?;
        self.store().save_encoders(&encoders)?;
        Ok(encoders)
    }

    #[cfg(feature = "train")]
    fn remove_model(&self) -> Result<()> {
        let path = self.model_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "removed stale model");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WebcompatError::file_io(path, e)),
        }
    }

    #[cfg(feature = "train")]
    fn save_model(&self, booster: &Booster) -> Result<()> {
        fs::create_dir_all(self.paths.pipeline_dir(self.kind))?;
        let path = self.model_path();
        booster.save(&path)?;
        info!(path = %path.display(), n_trees = booster.n_trees(), "saved model");
        Ok(())
    }

    pub fn load_encoders(&self) -> Result<EncoderSet> {
        self.store().load_encoders()
    }

    /// Trains the model with the given encoders and stores it.
    #[cfg(feature = "train")]
    pub fn model_train(
        &self,
        records: &[Record],
        encoders: &EncoderSet,
        config: &TrainConfig,
    ) -> Result<TrainOutput> {
        let output = ModelTrainer::new(config.clone()).train(records, encoders)?;
        self.save_model(&output.booster)?;
        Ok(output)
    }

    pub fn load_model(&self) -> Result<Booster> {
        Booster::load(self.model_path())
    }

    /// Loads the stored encoders and model.
    ///
    /// Encoders are loaded first, so a pipeline that was never trained fails
    /// with [`crate::WebcompatError::EncoderNotFound`].
    pub fn predictor(&self) -> Result<Predictor> {
        let encoders = self.load_encoders()?;
        let booster = self.load_model()?;
        Predictor::new(encoders, booster)
    }

    /// Predicts `records` with the stored encoders and model.
    pub fn model_predict(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        self.predictor()?.predict(records)
    }

    /// Fits encoders and trains the model from a labelled CSV file.
    ///
    /// Nothing is written until training succeeds; a failed run leaves the
    /// previously stored encoders and model in place.
    #[cfg(feature = "train")]
    pub fn train<P>(&self, data: P, config: &TrainConfig) -> Result<TrainOutput>
    where
        P: AsRef<Path>,
    {
        config.validate()?;
        let records = read_records_from_path(data, self.kind, true)?;
        let encoders = EncoderSet::fit(self.kind, &records, config.max_features)?;
        let output = ModelTrainer::new(config.clone()).train(&records, &encoders)?;
        self.remove_model()?;
        self.store().save_encoders(&encoders)?;
        self.save_model(&output.booster)?;
        Ok(output)
    }

    /// Predicts a CSV file and writes the predictions into `output_dir`.
    ///
    /// # Returns
    ///
    /// The path of the written predictions file.
    pub fn predict<P, Q>(&self, data: P, format: OutputFormat, output_dir: Q) -> Result<PathBuf>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let predictor = self.predictor()?;
        let records = read_records_from_path(data, self.kind, false)?;
        let predictions = predictor.predict(&records)?;
        fs::create_dir_all(output_dir.as_ref())?;
        let path = save_predictions(&predictions, format, output_dir)?;
        info!(
            path = %path.display(),
            n_predictions = predictions.len(),
            "wrote predictions"
        );
        Ok(path)
    }
}
