//! Per-feature quantization of sparse training rows.

use crate::feature::FeatureMatrix;

/// Bin upper bounds of every feature, stored CSR-like.
///
/// Bin `b` of a feature holds values in `(cut[b - 1], cut[b]]`. The first cut
/// is always `0.0`, so bin 0 holds the zero (absent) entries of sparse rows
/// and never needs to be stored.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BinCuts {
    cut_values: Vec<f32>,
    cut_ptrs: Vec<usize>,
}

impl BinCuts {
    /// Computes cuts from the non-zero values of each column.
    ///
    /// When a feature has fewer than `max_bin` distinct positive values every
    /// value gets its own bin; otherwise the cuts are quantiles of the values.
    pub(crate) fn from_matrix(features: &FeatureMatrix, max_bin: usize) -> Self {
        let mut columns: Vec<Vec<f32>> = vec![vec![]; features.n_features()];
        for row in features.rows() {
            for &(f, v) in row {
                if v > 0.0 {
                    columns[f as usize].push(v);
                }
            }
        }
        let mut cut_values = vec![];
        let mut cut_ptrs = vec![0];
        for mut values in columns {
            cut_values.push(0.0);
            values.sort_unstable_by(f32::total_cmp);
            let mut distinct = values.clone();
            distinct.dedup();
            if distinct.len() < max_bin {
                cut_values.extend(distinct);
            } else {
                let n_cuts = max_bin - 1;
                let start = cut_values.len();
                for i in 1..=n_cuts {
                    let pos = (i * values.len() + n_cuts - 1) / n_cuts - 1;
                    let v = values[pos];
                    if cut_values.len() == start || cut_values[cut_values.len() - 1] < v {
                        cut_values.push(v);
                    }
                }
            }
            cut_ptrs.push(cut_values.len());
        }
        Self {
            cut_values,
            cut_ptrs,
        }
    }

    pub(crate) fn n_features(&self) -> usize {
        self.cut_ptrs.len() - 1
    }

    pub(crate) fn n_bins(&self, feature: usize) -> usize {
        self.cut_ptrs[feature + 1] - self.cut_ptrs[feature]
    }

    /// Offset of the feature's first bin in a flat histogram.
    pub(crate) fn offset(&self, feature: usize) -> usize {
        self.cut_ptrs[feature]
    }

    pub(crate) fn total_bins(&self) -> usize {
        self.cut_values.len()
    }

    /// Upper bound of a bin, used as the split threshold.
    pub(crate) fn threshold(&self, feature: usize, bin: usize) -> f32 {
        self.cut_values[self.cut_ptrs[feature] + bin]
    }

    /// Bin of a value.
    pub(crate) fn bin(&self, feature: usize, value: f32) -> u16 {
        let cuts = &self.cut_values[self.cut_ptrs[feature]..self.cut_ptrs[feature + 1]];
        let b = cuts.partition_point(|&c| c < value);
        b.min(cuts.len() - 1) as u16
    }
}

/// Sparse rows of (feature, bin) pairs; entries in bin 0 are omitted.
#[derive(Clone, Debug)]
pub(crate) struct BinnedMatrix {
    rows: Vec<Vec<(u32, u16)>>,
}

impl BinnedMatrix {
    pub(crate) fn new(features: &FeatureMatrix, cuts: &BinCuts) -> Self {
        let rows = features
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|&(f, v)| {
                        let bin = cuts.bin(f as usize, v);
                        (bin > 0).then_some((f, bin))
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub(crate) fn row(&self, i: usize) -> &[(u32, u16)] {
        &self.rows[i]
    }

    /// Bin of a feature in a row.
    pub(crate) fn bin(&self, i: usize, feature: u32) -> u16 {
        let row = &self.rows[i];
        row.binary_search_by_key(&feature, |&(f, _)| f)
            .map_or(0, |j| row[j].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(n_features: usize, rows: Vec<Vec<(u32, f32)>>) -> FeatureMatrix {
        let mut m = FeatureMatrix::new(n_features);
        for row in rows {
            m.push_row(row).unwrap();
        }
        m
    }

    #[test]
    fn test_distinct_value_cuts() {
        let m = matrix(
            3,
            vec![
                vec![(0, 1.0), (2, 3.0)],
                vec![(0, 2.0)],
                vec![(0, 1.0), (2, 1.0)],
            ],
        );
        let cuts = BinCuts::from_matrix(&m, 256);
        assert_eq!(3, cuts.n_features());
        assert_eq!(3, cuts.n_bins(0));
        assert_eq!(1, cuts.n_bins(1));
        assert_eq!(3, cuts.n_bins(2));
        assert_eq!(7, cuts.total_bins());
        assert_eq!(0.0, cuts.threshold(0, 0));
        assert_eq!(2.0, cuts.threshold(0, 2));
        assert_eq!(0, cuts.bin(0, 0.0));
        assert_eq!(1, cuts.bin(0, 1.0));
        assert_eq!(2, cuts.bin(2, 3.0));
        assert_eq!(2, cuts.bin(2, 9.0));
    }

    #[test]
    fn test_quantile_cuts() {
        let rows = (1..=10).map(|v| vec![(0, v as f32)]).collect();
        let cuts = BinCuts::from_matrix(&matrix(1, rows), 3);
        // zero bin plus two quantile bins
        assert_eq!(3, cuts.n_bins(0));
        assert_eq!(5.0, cuts.threshold(0, 1));
        assert_eq!(10.0, cuts.threshold(0, 2));
        assert_eq!(1, cuts.bin(0, 4.0));
        assert_eq!(2, cuts.bin(0, 6.0));
    }

    #[test]
    fn test_binned_matrix_drops_zero_bin() {
        let m = matrix(2, vec![vec![(0, 2.0), (1, 1.0)], vec![]]);
        let cuts = BinCuts::from_matrix(&m, 256);
        let binned = BinnedMatrix::new(&m, &cuts);
        assert_eq!(vec![(0u32, 1u16), (1, 1)], binned.row(0));
        assert!(binned.row(1).is_empty());
        assert_eq!(0, binned.bin(1, 0));
        assert_eq!(1, binned.bin(0, 1));
    }
}
