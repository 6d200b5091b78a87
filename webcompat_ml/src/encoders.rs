//! Fitted encoders and their durable store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::artifact::{self, ArtifactKind};
use crate::dataset::{PipelineKind, Record, TextField};
use crate::errors::{Result, WebcompatError};
use crate::label_encoder::LabelEncoder;
use crate::vectorizer::CountVectorizer;

/// Default vocabulary cap of each text vectorizer.
pub const DEFAULT_MAX_FEATURES: usize = 10000;

/// BLAKE3 digest of the vocabularies and classes of an [`EncoderSet`].
pub type EncoderFingerprint = [u8; 32];

const TARGET_ENCODER_FILE: &str = "target_encoder.bin";
const MODEL_FILE: &str = "model.bin";

/// Location of every artifact, one subdirectory per pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl ArtifactPaths {
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pipeline_dir(&self, kind: PipelineKind) -> PathBuf {
        self.root.join(kind.name())
    }

    pub fn vectorizer_path(&self, kind: PipelineKind, field: TextField) -> PathBuf {
        self.pipeline_dir(kind)
            .join(format!("{}_vectorizer.bin", field.column()))
    }

    pub fn target_encoder_path(&self, kind: PipelineKind) -> PathBuf {
        self.pipeline_dir(kind).join(TARGET_ENCODER_FILE)
    }

    pub fn model_path(&self, kind: PipelineKind) -> PathBuf {
        self.pipeline_dir(kind).join(MODEL_FILE)
    }
}

/// Every fitted encoder of one pipeline.
///
/// The feature layout is the concatenation of the vectorizer outputs in
/// [`PipelineKind::text_fields`] order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderSet {
    kind: PipelineKind,
    vectorizers: Vec<(TextField, CountVectorizer)>,
    target: LabelEncoder,
}

impl EncoderSet {
    /// Fits a vectorizer per text field and the target encoder.
    ///
    /// # Errors
    ///
    /// - [`WebcompatError::InsufficientData`] when `records` is empty or the
    ///   target does not have exactly two classes.
    /// - [`WebcompatError::SchemaMismatch`] when a record has no target.
    pub fn fit(kind: PipelineKind, records: &[Record], max_features: usize) -> Result<Self> {
        if records.is_empty() {
            return Err(WebcompatError::insufficient_data("the dataset is empty"));
        }
        if max_features == 0 {
            return Err(WebcompatError::invalid_argument(
                "max_features",
                "must be positive",
            ));
        }
        let mut targets = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let target = record.target.as_deref().ok_or_else(|| {
                WebcompatError::schema_mismatch(format!(
                    "record {i} has no {} value",
                    kind.target_column()
                ))
            })?;
            targets.push(target);
        }
        let mut target = LabelEncoder::new();
        target.fit(&targets);
        if target.n_classes() != 2 {
            return Err(WebcompatError::insufficient_data(format!(
                "{} needs exactly two classes, found {:?}",
                kind.target_column(),
                target.classes()
            )));
        }

        let mut vectorizers = Vec::with_capacity(kind.text_fields().len());
        for &field in kind.text_fields() {
            let docs: Vec<&str> = records.iter().map(|r| r.field(field)).collect();
            let mut vectorizer = CountVectorizer::new(max_features, field.analyzer());
            vectorizer.fit(&docs);
            if vectorizer.width() == 0 {
                warn!(field = field.column(), "empty vocabulary");
            }
            vectorizers.push((field, vectorizer));
        }
        Ok(Self {
            kind,
            vectorizers,
            target,
        })
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn vectorizers(&self) -> &[(TextField, CountVectorizer)] {
        &self.vectorizers
    }

    pub fn vectorizer(&self, field: TextField) -> Option<&CountVectorizer> {
        self.vectorizers
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    pub fn target(&self) -> &LabelEncoder {
        &self.target
    }

    /// Width of the encoded feature vector.
    pub fn n_features(&self) -> usize {
        self.vectorizers.iter().map(|(_, v)| v.width()).sum()
    }

    /// Digest identifying the exact vocabularies and target classes.
    ///
    /// A model records the fingerprint of the encoders it was trained with,
    /// so two sets of equal width but different vocabularies are told apart.
    pub fn fingerprint(&self) -> EncoderFingerprint {
        fn update_str(hasher: &mut blake3::Hasher, s: &str) {
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }

        let mut hasher = blake3::Hasher::new();
        update_str(&mut hasher, self.kind.name());
        for (field, vectorizer) in &self.vectorizers {
            update_str(&mut hasher, field.column());
            hasher.update(&(vectorizer.width() as u64).to_le_bytes());
            for term in vectorizer.vocabulary() {
                update_str(&mut hasher, term);
            }
        }
        hasher.update(&(self.target.n_classes() as u64).to_le_bytes());
        for class in self.target.classes() {
            update_str(&mut hasher, class);
        }
        *hasher.finalize().as_bytes()
    }

    /// Class ids of the records' targets.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::SchemaMismatch`] is returned when a target is missing
    /// or was not seen during fitting.
    pub fn encode_targets(&self, records: &[Record]) -> Result<Vec<u32>> {
        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let value = record.target.as_deref().ok_or_else(|| {
                    WebcompatError::schema_mismatch(format!(
                        "record {i} has no {} value",
                        self.kind.target_column()
                    ))
                })?;
                self.target.transform(value)
            })
            .collect()
    }
}

/// Persists and restores the [`EncoderSet`] of one pipeline.
///
/// Each fitted encoder is stored in its own file. Loading never refits, so
/// training and inference see identical vocabularies. Concurrent
/// [`EncoderStore::build_encoders`] and [`EncoderStore::load_encoders`] calls
/// on the same directory are not coordinated; callers must not retrain while
/// predictions are being served from the same artifacts.
#[derive(Clone, Debug)]
pub struct EncoderStore {
    paths: ArtifactPaths,
    kind: PipelineKind,
}

impl EncoderStore {
    pub fn new(paths: ArtifactPaths, kind: PipelineKind) -> Self {
        Self { paths, kind }
    }

    /// Fits encoders on `records` and writes them, replacing any stored ones.
    pub fn build_encoders(&self, records: &[Record], max_features: usize) -> Result<EncoderSet> {
        let encoders = EncoderSet::fit(self.kind, records, max_features)?;
        self.save_encoders(&encoders)?;
        Ok(encoders)
    }

    /// Writes already fitted encoders, replacing any stored ones.
    pub fn save_encoders(&self, encoders: &EncoderSet) -> Result<()> {
        if encoders.kind != self.kind {
            return Err(WebcompatError::invalid_argument(
                "encoders",
                format!("fitted for {}, not {}", encoders.kind, self.kind),
            ));
        }
        fs::create_dir_all(self.paths.pipeline_dir(self.kind))?;
        for (field, vectorizer) in &encoders.vectorizers {
            let path = self.paths.vectorizer_path(self.kind, *field);
            artifact::save(vectorizer, ArtifactKind::Vectorizer, &path)?;
            info!(
                field = field.column(),
                vocabulary = vectorizer.width(),
                path = %path.display(),
                "saved vectorizer"
            );
        }
        let path = self.paths.target_encoder_path(self.kind);
        artifact::save(&encoders.target, ArtifactKind::LabelEncoder, &path)?;
        info!(classes = ?encoders.target.classes(), "saved target encoder");
        Ok(())
    }

    /// Reads the stored encoders.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::EncoderNotFound`] is returned when any encoder file is
    /// missing, e.g. before the first training run.
    pub fn load_encoders(&self) -> Result<EncoderSet> {
        let mut vectorizers = Vec::with_capacity(self.kind.text_fields().len());
        for &field in self.kind.text_fields() {
            let path = self.paths.vectorizer_path(self.kind, field);
            let vectorizer: CountVectorizer = Self::load_one(ArtifactKind::Vectorizer, &path)?;
            if vectorizer.analyzer() != field.analyzer() {
                return Err(WebcompatError::invalid_artifact(format!(
                    "{} was fitted with the {:?} analyzer",
                    path.display(),
                    vectorizer.analyzer()
                )));
            }
            vectorizers.push((field, vectorizer));
        }
        let target: LabelEncoder = Self::load_one(
            ArtifactKind::LabelEncoder,
            &self.paths.target_encoder_path(self.kind),
        )?;
        Ok(EncoderSet {
            kind: self.kind,
            vectorizers,
            target,
        })
    }

    fn load_one<T>(kind: ArtifactKind, path: &Path) -> Result<T>
    where
        T: bincode::Decode<()>,
    {
        if !path.is_file() {
            return Err(WebcompatError::EncoderNotFound {
                path: path.to_path_buf(),
            });
        }
        artifact::load(kind, path)
    }
}
