//! In-memory classifiers, one concrete type per pipeline.

use crate::config::TrainConfig;
use crate::dataset::{PipelineKind, Record};
use crate::encoders::EncoderSet;
use crate::errors::{Result, WebcompatError};
use crate::metrics::ClassificationReport;
use crate::predictor::{Prediction, Predictor};
use crate::trainer::ModelTrainer;

/// Common interface of the pipeline classifiers.
pub trait Classifier {
    /// Fits encoders and the model on labelled records, replacing any
    /// previous fit.
    fn fit(&mut self, records: &[Record]) -> Result<&ClassificationReport>;

    /// Predicted labels, in input order.
    fn predict(&self, records: &[Record]) -> Result<Vec<Prediction>>;

    /// Class probabilities, indexed like [`Classifier::classes`].
    fn predict_proba(&self, records: &[Record]) -> Result<Vec<[f32; 2]>>;

    /// Class names after fitting.
    fn classes(&self) -> Option<&[String]>;
}

#[derive(Clone, Debug)]
struct Fitted {
    predictor: Predictor,
    report: ClassificationReport,
}

#[derive(Clone, Debug)]
struct TextClassifier {
    kind: PipelineKind,
    config: TrainConfig,
    fitted: Option<Fitted>,
}

impl TextClassifier {
    fn new(kind: PipelineKind, config: TrainConfig) -> Self {
        Self {
            kind,
            config,
            fitted: None,
        }
    }

    fn fit(&mut self, records: &[Record]) -> Result<&ClassificationReport> {
        self.config.validate()?;
        let encoders = EncoderSet::fit(self.kind, records, self.config.max_features)?;
        let output = ModelTrainer::new(self.config.clone()).train(records, &encoders)?;
        let fitted = self.fitted.insert(Fitted {
            predictor: Predictor::new(encoders, output.booster)?,
            report: output.report,
        });
        Ok(&fitted.report)
    }

    fn predictor(&self) -> Result<&Predictor> {
        self.fitted
            .as_ref()
            .map(|f| &f.predictor)
            .ok_or_else(|| WebcompatError::NotFitted {
                msg: format!("the {} classifier has not been fitted", self.kind),
            })
    }

    fn classes(&self) -> Option<&[String]> {
        self.fitted
            .as_ref()
            .map(|f| f.predictor.encoders().target().classes())
    }
}

macro_rules! pipeline_classifier {
    ($(#[$attr:meta])* $name:ident, $kind:expr) => {
        $(#[$attr])*
        #[derive(Clone, Debug)]
        pub struct $name {
            inner: TextClassifier,
        }

        impl $name {
            pub fn new(config: TrainConfig) -> Self {
                Self {
                    inner: TextClassifier::new($kind, config),
                }
            }

            /// Metrics of the last fit on its evaluation partition.
            pub fn report(&self) -> Option<&ClassificationReport> {
                self.inner.fitted.as_ref().map(|f| &f.report)
            }

            /// Predictor of the last fit.
            pub fn predictor(&self) -> Option<&Predictor> {
                self.inner.fitted.as_ref().map(|f| &f.predictor)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(TrainConfig::default())
            }
        }

        impl Classifier for $name {
            fn fit(&mut self, records: &[Record]) -> Result<&ClassificationReport> {
                self.inner.fit(records)
            }

            fn predict(&self, records: &[Record]) -> Result<Vec<Prediction>> {
                self.inner.predictor()?.predict(records)
            }

            fn predict_proba(&self, records: &[Record]) -> Result<Vec<[f32; 2]>> {
                self.inner.predictor()?.predict_proba(records)
            }

            fn classes(&self) -> Option<&[String]> {
                self.inner.classes()
            }
        }
    };
}

pipeline_classifier!(
    /// Predicts whether an issue will be closed as invalid, from its body,
    /// title and labels.
    InvalidModel,
    PipelineKind::Invalid
);

pipeline_classifier!(
    /// Predicts whether an issue needs diagnosis, from its body and title.
    NeedsDiagnosisModel,
    PipelineKind::NeedsDiagnosis
);
