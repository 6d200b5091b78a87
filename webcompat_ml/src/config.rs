use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoders::DEFAULT_MAX_FEATURES;
use crate::errors::{Result, WebcompatError};
use crate::gbdt::GbdtParams;

/// Default fraction of rows used for training.
pub const DEFAULT_SPLIT_RATIO: f64 = 0.7;

/// Training configuration.
///
/// Every key is optional in TOML:
///
/// ```toml
/// split_ratio = 0.7
/// seed = 42
/// max_features = 10000
///
/// [gbdt]
/// n_rounds = 20
/// max_depth = 7
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Fraction of rows used for training; the rest drives early stopping.
    pub split_ratio: f64,

    /// Seed of the split and of the row and column sampling.
    pub seed: u64,

    /// Vocabulary cap of each text vectorizer.
    pub max_features: usize,

    pub gbdt: GbdtParams,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            split_ratio: DEFAULT_SPLIT_RATIO,
            seed: 0,
            max_features: DEFAULT_MAX_FEATURES,
            gbdt: GbdtParams::default(),
        }
    }
}

impl TrainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|e| WebcompatError::file_io(path, e))?;
        Self::from_toml_str(&s)
    }

    /// Parameters handed to the tree learner, seeded from [`TrainConfig::seed`].
    pub fn gbdt_params(&self) -> GbdtParams {
        GbdtParams {
            seed: self.seed,
            ..self.gbdt.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(WebcompatError::invalid_argument(
                "split",
                format!("must be in (0, 1), got {}", self.split_ratio),
            ));
        }
        if self.max_features == 0 {
            return Err(WebcompatError::invalid_argument(
                "max_features",
                "must be positive",
            ));
        }
        self.gbdt.validate()
    }
}
