//! Evaluation metrics of a trained classifier.

use std::fmt;

use serde::Serialize;

use crate::errors::{Result, WebcompatError};

/// Counts of (truth, prediction) pairs. Rows are true classes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Counts the pairs of `truth` and `pred`.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::InvalidArgument`] is returned when the slices differ in
    /// length or hold a class id of `n_classes` or above.
    pub fn new(n_classes: usize, truth: &[u32], pred: &[u32]) -> Result<Self> {
        if truth.len() != pred.len() {
            return Err(WebcompatError::invalid_argument(
                "pred",
                format!("{} predictions for {} labels", pred.len(), truth.len()),
            ));
        }
        let mut counts = vec![vec![0; n_classes]; n_classes];
        for (&t, &p) in truth.iter().zip(pred) {
            let (t, p) = (t as usize, p as usize);
            if t >= n_classes || p >= n_classes {
                return Err(WebcompatError::invalid_argument(
                    "class",
                    format!("class id {} is out of range for {n_classes} classes", t.max(p)),
                ));
            }
            counts[t][p] += 1;
        }
        Ok(Self { counts })
    }

    pub fn get(&self, truth: usize, pred: usize) -> usize {
        self.counts[truth][pred]
    }

    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall and F1, with accuracy and macro averages.
///
/// Ratios with a zero denominator are reported as 0.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub confusion: ConfusionMatrix,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Builds a report.
    ///
    /// # Arguments
    ///
    /// * `classes` - Class names, indexed by class id.
    /// * `truth` - True class ids.
    /// * `pred` - Predicted class ids.
    ///
    /// # Errors
    ///
    /// See [`ConfusionMatrix::new`].
    pub fn new<S>(classes: &[S], truth: &[u32], pred: &[u32]) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let confusion = ConfusionMatrix::new(classes.len(), truth, pred)?;
        let n = classes.len();
        let mut metrics = Vec::with_capacity(n);
        for (c, name) in classes.iter().enumerate() {
            let tp = confusion.get(c, c);
            let support: usize = (0..n).map(|p| confusion.get(c, p)).sum();
            let predicted: usize = (0..n).map(|t| confusion.get(t, c)).sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            metrics.push(ClassMetrics {
                class: name.as_ref().to_string(),
                precision,
                recall,
                f1,
                support,
            });
        }
        let correct: usize = (0..n).map(|c| confusion.get(c, c)).sum();
        let mean = |f: fn(&ClassMetrics) -> f64| {
            if metrics.is_empty() {
                0.0
            } else {
                metrics.iter().map(f).sum::<f64>() / metrics.len() as f64
            }
        };
        Ok(Self {
            accuracy: ratio(correct, confusion.total()),
            macro_precision: mean(|m| m.precision),
            macro_recall: mean(|m| m.recall),
            macro_f1: mean(|m| m.f1),
            classes: metrics,
            confusion,
        })
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|m| m.class.len())
            .chain(["macro avg".len()])
            .max()
            .unwrap_or(0);
        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for m in &self.classes {
            writeln!(
                f,
                "{:>width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9}",
                m.class, m.precision, m.recall, m.f1, m.support
            )?;
        }
        let total = self.confusion.total();
        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9.4}  {:>9}",
            "accuracy", "", "", self.accuracy, total
        )?;
        writeln!(
            f,
            "{:>width$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>9}",
            "macro avg", self.macro_precision, self.macro_recall, self.macro_f1, total
        )?;
        writeln!(f)?;
        writeln!(f, "confusion matrix (rows: truth, columns: prediction)")?;
        write!(f, "{:>width$}", "")?;
        for m in &self.classes {
            write!(f, "  {:>9}", m.class)?;
        }
        writeln!(f)?;
        for (t, m) in self.classes.iter().enumerate() {
            write!(f, "{:>width$}", m.class)?;
            for p in 0..self.confusion.n_classes() {
                write!(f, "  {:>9}", self.confusion.get(t, p))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
