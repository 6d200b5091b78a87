//! Logistic loss (binary cross-entropy) over log-odds margins.
//!
//! - Gradient: `σ(margin) - y`
//! - Hessian: `σ(margin) * (1 - σ(margin))`

use crate::gbdt::booster::sigmoid;
use crate::gbdt::grower::GradPair;

const HESS_MIN: f64 = 1e-6;
const PROB_EPS: f64 = 1e-15;

pub(crate) fn gradients(margins: &[f64], labels: &[f32]) -> Vec<GradPair> {
    debug_assert_eq!(margins.len(), labels.len());
    margins
        .iter()
        .zip(labels)
        .map(|(&m, &y)| {
            let p = sigmoid(m);
            GradPair::new(p - f64::from(y), (p * (1.0 - p)).max(HESS_MIN))
        })
        .collect()
}

/// Log-odds of the positive rate.
pub(crate) fn base_margin(labels: &[f32]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }
    let pos: f64 = labels.iter().map(|&y| f64::from(y)).sum();
    let p = (pos / labels.len() as f64).clamp(1e-7, 1.0 - 1e-7);
    (p / (1.0 - p)).ln() as f32
}

/// Mean negative log-likelihood.
pub fn logloss(margins: &[f64], labels: &[f32]) -> f64 {
    debug_assert_eq!(margins.len(), labels.len());
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = margins
        .iter()
        .zip(labels)
        .map(|(&m, &y)| {
            let p = sigmoid(m).clamp(PROB_EPS, 1.0 - PROB_EPS);
            let y = f64::from(y);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / labels.len() as f64
}
