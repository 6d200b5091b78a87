//! Definition of errors.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = WebcompatError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WebcompatError {
    /// A required column is absent or a cell cannot be interpreted.
    #[error("SchemaMismatchError: {msg}")]
    SchemaMismatch { msg: String },

    /// Inference was attempted before any encoders were fitted.
    #[error("EncoderNotFoundError: no fitted encoder at {}", path.display())]
    EncoderNotFound { path: PathBuf },

    /// Inference was attempted before any model was trained.
    #[error("ModelNotFoundError: no trained model at {}", path.display())]
    ModelNotFound { path: PathBuf },

    /// The training data cannot produce a meaningful binary classifier.
    #[error("InsufficientDataError: {msg}")]
    InsufficientData { msg: String },

    /// Encoded vectors and the model disagree on the feature width.
    #[error("FeatureWidthMismatchError: encoded width is {actual}, but the model expects {expected}")]
    FeatureWidthMismatch { expected: usize, actual: usize },

    /// The stored model was trained with other encoders than the stored ones,
    /// e.g. after the encoders were rebuilt without retraining.
    #[error("EncoderMismatchError: the model was not trained with these encoders; retrain the pipeline")]
    EncoderMismatch,

    /// An in-memory classifier was used before `fit`.
    #[error("NotFittedError: {msg}")]
    NotFitted { msg: String },

    #[error("InvalidArgumentError: {arg}: {msg}")]
    InvalidArgument { arg: &'static str, msg: String },

    /// An artifact file exists but is not something this crate wrote.
    #[error("InvalidArtifactError: {msg}")]
    InvalidArtifact { msg: String },

    /// A named file could not be opened or read.
    #[error("IOError: {}: {source}", path.display())]
    FileIOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    CsvError(#[from] csv::Error),

    #[error(transparent)]
    DecodeError(#[from] bincode::error::DecodeError),

    #[error(transparent)]
    EncodeError(#[from] bincode::error::EncodeError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
}

impl WebcompatError {
    pub(crate) fn schema_mismatch<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::SchemaMismatch { msg: msg.into() }
    }

    pub(crate) fn insufficient_data<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InsufficientData { msg: msg.into() }
    }

    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument {
            arg,
            msg: msg.into(),
        }
    }

    pub(crate) fn file_io<P>(path: P, source: std::io::Error) -> Self
    where
        P: Into<PathBuf>,
    {
        Self::FileIOError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_artifact<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArtifact { msg: msg.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width_mismatch() {
        let e = WebcompatError::FeatureWidthMismatch {
            expected: 20,
            actual: 12,
        };
        assert_eq!(
            "FeatureWidthMismatchError: encoded width is 12, but the model expects 20",
            e.to_string()
        );
    }

    #[test]
    fn test_display_invalid_argument() {
        let e = WebcompatError::invalid_argument("split", "must be in (0, 1)");
        assert_eq!("InvalidArgumentError: split: must be in (0, 1)", e.to_string());
    }

    #[test]
    fn test_display_file_io() {
        let e = WebcompatError::file_io(
            "data/issues.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!("IOError: data/issues.csv: not found", e.to_string());
    }
}
