use serde::Serialize;

use crate::dataset::Record;
use crate::encoders::EncoderSet;
use crate::errors::{Result, WebcompatError};
use crate::feature::{self, check_width, FeatureMatrix};
use crate::gbdt::{Booster, DECISION_THRESHOLD};

/// Predicted class of one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,

    /// Probability of `label`.
    pub probability: f32,
}

/// Predictor over loaded encoders and a trained model.
///
/// Neither the encoders nor the model change after construction, so one
/// predictor can be shared between threads.
#[derive(Clone, Debug)]
pub struct Predictor {
    encoders: EncoderSet,
    booster: Booster,
}

impl Predictor {
    /// Creates a new predictor.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::FeatureWidthMismatch`] is returned when the encoders
    /// produce vectors of a different width than the model was trained on,
    /// e.g. after re-fitting the encoders without retraining.
    /// [`WebcompatError::EncoderMismatch`] is returned when the widths agree
    /// but the model was trained with other vocabularies or classes.
    pub fn new(encoders: EncoderSet, booster: Booster) -> Result<Self> {
        check_width(booster.n_features(), encoders.n_features())?;
        if encoders.target().n_classes() != 2 {
            return Err(WebcompatError::invalid_artifact(format!(
                "the target encoder holds {} classes",
                encoders.target().n_classes()
            )));
        }
        if booster.encoder_fingerprint() != &encoders.fingerprint() {
            return Err(WebcompatError::EncoderMismatch);
        }
        Ok(Self { encoders, booster })
    }

    pub fn encoders(&self) -> &EncoderSet {
        &self.encoders
    }

    pub fn booster(&self) -> &Booster {
        &self.booster
    }

    fn encode(&self, records: &[Record]) -> Result<FeatureMatrix> {
        feature::encode(records, &self.encoders)
    }

    /// Class ids of the records, in input order.
    pub fn predict_ids(&self, records: &[Record]) -> Result<Vec<u32>> {
        self.booster.predict(&self.encode(records)?)
    }

    /// Class probabilities of the records, indexed by class id.
    pub fn predict_proba(&self, records: &[Record]) -> Result<Vec<[f32; 2]>> {
        Ok(self
            .booster
            .predict_proba(&self.encode(records)?)?
            .into_iter()
            .map(|p| [1.0 - p, p])
            .collect())
    }

    /// Predicted labels with their probabilities, in input order.
    pub fn predict(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        let classes = self.encoders.target().classes();
        Ok(self
            .booster
            .predict_proba(&self.encode(records)?)?
            .into_iter()
            .map(|p| {
                let (id, probability) = if p > DECISION_THRESHOLD {
                    (1, p)
                } else {
                    (0, 1.0 - p)
                };
                Prediction {
                    label: classes[id].clone(),
                    probability,
                }
            })
            .collect())
    }
}

/// Predicts records with the given model and encoders.
pub fn predict_records(
    records: &[Record],
    booster: &Booster,
    encoders: &EncoderSet,
) -> Result<Vec<Prediction>> {
    Predictor::new(encoders.clone(), booster.clone())?.predict(records)
}
