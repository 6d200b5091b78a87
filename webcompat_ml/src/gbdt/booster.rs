use std::io::{Read, Write};
use std::path::Path;

use bincode::{Decode, Encode};

use crate::artifact::{self, ArtifactKind};
use crate::encoders::EncoderFingerprint;
use crate::errors::{Result, WebcompatError};
use crate::feature::{check_width, FeatureMatrix};
use crate::gbdt::tree::Tree;
use crate::vectorizer::SparseEntry;

/// Probability above which a row is assigned the positive class.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Trained binary boosted-tree ensemble with a logistic link.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct Booster {
    n_features: usize,
    base_margin: f32,
    trees: Vec<Tree>,
    best_iteration: Option<usize>,
    encoder_fingerprint: EncoderFingerprint,
}

impl Booster {
    #[cfg_attr(not(feature = "train"), allow(dead_code))]
    pub(crate) fn new(
        n_features: usize,
        base_margin: f32,
        trees: Vec<Tree>,
        best_iteration: Option<usize>,
    ) -> Self {
        Self {
            n_features,
            base_margin,
            trees,
            best_iteration,
            encoder_fingerprint: [0; 32],
        }
    }

    /// Binds the model to the encoders that produced its training features.
    #[cfg_attr(not(feature = "train"), allow(dead_code))]
    pub(crate) fn with_encoder_fingerprint(mut self, fingerprint: EncoderFingerprint) -> Self {
        self.encoder_fingerprint = fingerprint;
        self
    }

    /// Feature width the ensemble was trained on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn base_margin(&self) -> f32 {
        self.base_margin
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Round of the retained snapshot when early stopping was active.
    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    /// Fingerprint of the encoders the model was trained with.
    pub fn encoder_fingerprint(&self) -> &EncoderFingerprint {
        &self.encoder_fingerprint
    }

    /// Raw log-odds of one row.
    pub fn predict_margin_row(&self, row: &[SparseEntry]) -> f64 {
        self.trees
            .iter()
            .fold(f64::from(self.base_margin), |acc, tree| {
                acc + f64::from(tree.predict_row(row))
            })
    }

    /// Raw log-odds of every row.
    pub fn predict_margin(&self, features: &FeatureMatrix) -> Result<Vec<f64>> {
        check_width(self.n_features, features.n_features())?;
        Ok(features
            .rows()
            .iter()
            .map(|row| self.predict_margin_row(row))
            .collect())
    }

    /// Probability of the positive class (class id 1) of every row.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::FeatureWidthMismatch`] is returned when `features`
    /// was encoded with a different width than the training data.
    pub fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<f32>> {
        Ok(self
            .predict_margin(features)?
            .into_iter()
            .map(|m| sigmoid(m) as f32)
            .collect())
    }

    /// Class id of every row.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<u32>> {
        Ok(self
            .predict_proba(features)?
            .into_iter()
            .map(|p| u32::from(p > DECISION_THRESHOLD))
            .collect())
    }

    /// Exports the model.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        artifact::write_to(self, ArtifactKind::Model, wtr)
    }

    /// Creates a model from a reader.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::InvalidArtifact`] is returned when the data is not a
    /// model or its trees are inconsistent with the stored width.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let booster: Self = artifact::read_from(ArtifactKind::Model, rdr)?;
        if booster.trees.iter().any(|tree| !tree.is_well_formed()) {
            return Err(WebcompatError::invalid_artifact("malformed tree"));
        }
        let max_feature = booster.trees.iter().filter_map(Tree::max_feature).max();
        if let Some(f) = max_feature {
            if f as usize >= booster.n_features {
                return Err(WebcompatError::invalid_artifact(format!(
                    "split on feature {f} exceeds model width {}",
                    booster.n_features
                )));
            }
        }
        Ok(booster)
    }

    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        artifact::save(self, ArtifactKind::Model, path.as_ref())
    }

    /// Reads a model file.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::ModelNotFound`] is returned when `path` does not exist.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(WebcompatError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        let mut f = std::fs::File::open(path)?;
        Self::read(&mut f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::gbdt::tree::Node;

    fn booster() -> Booster {
        let tree = Tree::new(vec![
            Node::Split {
                feature: 1,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: -2.0 },
            Node::Leaf { value: 2.0 },
        ]);
        Booster::new(3, 0.5, vec![tree, Tree::leaf(-0.5)], None)
    }

    fn matrix(n_features: usize, rows: Vec<Vec<SparseEntry>>) -> FeatureMatrix {
        let mut m = FeatureMatrix::new(n_features);
        for row in rows {
            m.push_row(row).unwrap();
        }
        m
    }

    #[test]
    fn test_predict() {
        let b = booster();
        let x = matrix(3, vec![vec![(1, 1.0)], vec![(0, 4.0)]]);
        let margins = b.predict_margin(&x).unwrap();
        assert_relative_eq!(2.0, margins[0]);
        assert_relative_eq!(-2.0, margins[1]);
        let proba = b.predict_proba(&x).unwrap();
        assert_relative_eq!(0.880_797, proba[0], epsilon = 1e-5);
        assert_eq!(vec![1, 0], b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_width_mismatch() {
        let b = booster();
        let x = matrix(5, vec![vec![(4, 1.0)]]);
        assert!(matches!(
            b.predict(&x),
            Err(WebcompatError::FeatureWidthMismatch {
                expected: 3,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_write_read() {
        let b = booster().with_encoder_fingerprint([7; 32]);
        let mut buf = vec![];
        b.write(&mut buf).unwrap();
        let loaded = Booster::read(&mut buf.as_slice()).unwrap();
        assert_eq!(b, loaded);
        assert_eq!(&[7; 32], loaded.encoder_fingerprint());
    }

    #[test]
    fn test_read_rejects_out_of_range_split() {
        let tree = Tree::new(vec![
            Node::Split {
                feature: 7,
                threshold: 0.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: 0.0 },
            Node::Leaf { value: 0.0 },
        ]);
        let mut buf = vec![];
        Booster::new(3, 0.0, vec![tree], None).write(&mut buf).unwrap();
        assert!(matches!(
            Booster::read(&mut buf.as_slice()),
            Err(WebcompatError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Booster::load(dir.path().join("model.bin")),
            Err(WebcompatError::ModelNotFound { .. })
        ));
    }
}
