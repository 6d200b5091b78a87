//! Sparse feature rows built from fitted encoders.

use crate::dataset::Record;
use crate::encoders::EncoderSet;
use crate::errors::{Result, WebcompatError};
use crate::vectorizer::SparseEntry;

/// Row-major sparse matrix with a fixed width.
///
/// Each row lists its non-zero entries sorted by column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureMatrix {
    n_features: usize,
    rows: Vec<Vec<SparseEntry>>,
}

impl FeatureMatrix {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            rows: vec![],
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::FeatureWidthMismatch`] is returned when an entry lies
    /// outside the matrix width.
    pub fn push_row(&mut self, row: Vec<SparseEntry>) -> Result<()> {
        if let Some(&(col, _)) = row.last() {
            if col as usize >= self.n_features {
                return Err(WebcompatError::FeatureWidthMismatch {
                    expected: self.n_features,
                    actual: col as usize + 1,
                });
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn row(&self, i: usize) -> &[SparseEntry] {
        &self.rows[i]
    }

    pub fn rows(&self) -> &[Vec<SparseEntry>] {
        &self.rows
    }

    /// Copies the given rows into a new matrix, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            n_features: self.n_features,
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Value at (`row`, `col`), zero when absent.
    pub fn get(&self, row: usize, col: u32) -> f32 {
        let row = &self.rows[row];
        row.binary_search_by_key(&col, |&(c, _)| c)
            .map_or(0.0, |i| row[i].1)
    }
}

/// Encodes one record as the concatenation of its field vectors.
pub fn encode_record(record: &Record, encoders: &EncoderSet) -> Vec<SparseEntry> {
    let mut row = vec![];
    let mut offset = 0;
    for (field, vectorizer) in encoders.vectorizers() {
        row.extend(
            vectorizer
                .transform(record.field(*field))
                .into_iter()
                .map(|(col, v)| (col + offset, v)),
        );
        offset += vectorizer.width() as u32;
    }
    row
}

/// Encodes every record.
pub fn encode(records: &[Record], encoders: &EncoderSet) -> Result<FeatureMatrix> {
    let mut matrix = FeatureMatrix::new(encoders.n_features());
    for record in records {
        matrix.push_row(encode_record(record, encoders))?;
    }
    Ok(matrix)
}

/// Checks that encoded rows match the width a model was trained on.
pub fn check_width(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(WebcompatError::FeatureWidthMismatch { expected, actual });
    }
    Ok(())
}
