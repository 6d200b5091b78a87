//! Seeded, class-stratified train/evaluation split.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::errors::{Result, WebcompatError};

/// Row indices of each partition, in ascending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub eval: Vec<usize>,
}

/// Splits rows so that the training partition holds `round(ratio * N)` rows.
///
/// Each class contributes to the training partition in proportion to its size;
/// the rows left over after flooring go to the classes with the largest
/// remainders. Rows are drawn at random within each class.
///
/// # Errors
///
/// - [`WebcompatError::InvalidArgument`] when `ratio` is not in (0, 1).
/// - [`WebcompatError::InsufficientData`] when either partition would be
///   empty or a class is absent from the evaluation partition.
pub fn train_eval_split(labels: &[u32], ratio: f64, seed: u64) -> Result<Split> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(WebcompatError::invalid_argument(
            "split",
            format!("must be in (0, 1), got {ratio}"),
        ));
    }
    let n = labels.len();
    let n_train = (ratio * n as f64).round() as usize;
    if n_train == 0 || n_train >= n {
        return Err(WebcompatError::insufficient_data(format!(
            "a split ratio of {ratio} over {n} rows leaves a partition empty"
        )));
    }

    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }

    // Largest remainder allocation of n_train over the classes.
    let mut quotas: Vec<(u32, usize, f64)> = groups
        .iter()
        .map(|(&class, rows)| {
            let exact = rows.len() as f64 * n_train as f64 / n as f64;
            (class, exact.floor() as usize, exact - exact.floor())
        })
        .collect();
    let allocated: usize = quotas.iter().map(|&(_, q, _)| q).sum();
    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| quotas[b].2.total_cmp(&quotas[a].2).then(a.cmp(&b)));
    for &i in order.iter().take(n_train - allocated) {
        quotas[i].1 += 1;
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut eval = Vec::with_capacity(n - n_train);
    for (class, quota, _) in quotas {
        let mut rows = groups.remove(&class).unwrap_or_default();
        rows.shuffle(&mut rng);
        if quota >= rows.len() {
            return Err(WebcompatError::insufficient_data(format!(
                "class {class} is absent from the evaluation split"
            )));
        }
        let rest = rows.split_off(quota);
        train.extend(rows);
        eval.extend(rest);
    }
    train.sort_unstable();
    eval.sort_unstable();
    Ok(Split { train, eval })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let labels: Vec<u32> = (0..10).map(|i| u32::from(i % 3 == 0)).collect();
        let split = train_eval_split(&labels, 0.7, 1).unwrap();
        assert_eq!(7, split.train.len());
        assert_eq!(3, split.eval.len());
        let mut all: Vec<_> = split.train.iter().chain(&split.eval).copied().collect();
        all.sort_unstable();
        assert_eq!((0..10).collect::<Vec<_>>(), all);
    }

    #[test]
    fn test_split_stratified() {
        let labels = [1, 0, 1, 0];
        let split = train_eval_split(&labels, 0.5, 3).unwrap();
        assert_eq!(2, split.train.len());
        let train_classes: Vec<_> = split.train.iter().map(|&i| labels[i]).collect();
        let eval_classes: Vec<_> = split.eval.iter().map(|&i| labels[i]).collect();
        assert!(train_classes.contains(&0) && train_classes.contains(&1));
        assert!(eval_classes.contains(&0) && eval_classes.contains(&1));
    }

    #[test]
    fn test_split_deterministic() {
        let labels: Vec<u32> = (0..50).map(|i| i % 2).collect();
        assert_eq!(
            train_eval_split(&labels, 0.7, 9).unwrap(),
            train_eval_split(&labels, 0.7, 9).unwrap()
        );
    }

    #[test]
    fn test_split_class_missing_from_eval() {
        let labels = [0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        assert!(matches!(
            train_eval_split(&labels, 0.7, 0),
            Err(WebcompatError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_split_invalid_ratio() {
        assert!(matches!(
            train_eval_split(&[0, 1], 1.0, 0),
            Err(WebcompatError::InvalidArgument { arg: "split", .. })
        ));
        assert!(matches!(
            train_eval_split(&[0, 1], 0.1, 0),
            Err(WebcompatError::InsufficientData { .. })
        ));
        assert!(train_eval_split(&[], 0.5, 0).is_err());
    }
}
