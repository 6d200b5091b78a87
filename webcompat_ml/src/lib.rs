#![cfg_attr(docsrs, feature(doc_cfg))]

//! # webcompat_ml
//!
//! Gradient-boosted tree classifiers for web-compatibility bug reports.
//!
//! Two fixed pipelines are provided: [`PipelineKind::Invalid`] predicts whether
//! an issue will be closed as invalid, and [`PipelineKind::NeedsDiagnosis`]
//! predicts whether it needs diagnosis. Issue text is vectorized with frozen
//! bag-of-words vocabularies that are stored next to the model, so inference
//! always encodes exactly as training did.
//!
//! ## Examples
//!
//! ```no_run
//! use webcompat_ml::{ArtifactPaths, OutputFormat, Pipeline, PipelineKind, TrainConfig};
//!
//! let pipeline = Pipeline::new(PipelineKind::Invalid, ArtifactPaths::new("artifacts"));
//! let output = pipeline.train("issues.csv", &TrainConfig::default()).unwrap();
//! println!("{}", output.report);
//!
//! let path = pipeline.predict("new_issues.csv", OutputFormat::Json, ".").unwrap();
//! println!("predictions written to {}", path.display());
//! ```
//!
//! Training requires **crate feature** `train` (enabled by default).

mod artifact;
mod dataset;
mod encoders;
mod feature;
mod label_encoder;
mod metrics;
mod output;
mod pipeline;
mod predictor;
mod tokenizer;
mod vectorizer;

pub mod config;
pub mod errors;
pub mod gbdt;

#[cfg(feature = "train")]
mod classifier;
#[cfg(feature = "train")]
mod split;
#[cfg(feature = "train")]
mod trainer;

pub use config::{TrainConfig, DEFAULT_SPLIT_RATIO};
pub use dataset::{
    read_records, read_records_from_path, PipelineKind, Record, TextField, REQUIRED_COLUMNS,
};
pub use encoders::{
    ArtifactPaths, EncoderFingerprint, EncoderSet, EncoderStore, DEFAULT_MAX_FEATURES,
};
pub use errors::{Result, WebcompatError};
pub use feature::{check_width, encode, encode_record, FeatureMatrix};
pub use gbdt::Booster;
pub use label_encoder::LabelEncoder;
pub use metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use output::{save_predictions, write_predictions, OutputFormat};
pub use pipeline::Pipeline;
pub use predictor::{predict_records, Prediction, Predictor};
pub use tokenizer::{
    is_stop_word, lemmatize, Analyzer, EnglishTokenizer, LabelTokenizer, Tokenize,
};
pub use vectorizer::{CountVectorizer, SparseEntry};

#[cfg(feature = "train")]
pub use classifier::{Classifier, InvalidModel, NeedsDiagnosisModel};
#[cfg(feature = "train")]
pub use split::{train_eval_split, Split};
#[cfg(feature = "train")]
pub use trainer::{ModelTrainer, TrainOutput};
