use serde::{Deserialize, Serialize};

use crate::errors::{Result, WebcompatError};

/// Hyper-parameters of the boosted-tree learner.
///
/// Missing TOML keys take the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtParams {
    /// Upper bound of boosting rounds.
    pub n_rounds: usize,

    /// Shrinkage applied to every leaf weight (eta).
    pub learning_rate: f64,

    pub max_depth: usize,

    /// Minimum loss reduction required to split a node (gamma).
    pub min_split_gain: f64,

    /// Minimum hessian sum of each child.
    pub min_child_weight: f64,

    /// L2 regularization of leaf weights (lambda).
    pub reg_lambda: f64,

    /// Fraction of training rows drawn for each round.
    pub subsample: f64,

    /// Fraction of features drawn for each tree.
    pub colsample_bytree: f64,

    /// Maximum number of histogram bins per feature.
    pub max_bin: usize,

    /// Rounds without eval-loss improvement before stopping.
    pub early_stopping_rounds: usize,

    pub seed: u64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_rounds: 20,
            learning_rate: 0.1,
            max_depth: 7,
            min_split_gain: 1.0,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            subsample: 0.5,
            colsample_bytree: 0.8,
            max_bin: 256,
            early_stopping_rounds: 10,
            seed: 0,
        }
    }
}

impl GbdtParams {
    /// Checks parameter ranges.
    ///
    /// # Errors
    ///
    /// [`WebcompatError::InvalidArgument`] names the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        if self.n_rounds == 0 {
            return Err(WebcompatError::invalid_argument(
                "n_rounds",
                "must be positive",
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(WebcompatError::invalid_argument(
                "learning_rate",
                "must be in (0, 1]",
            ));
        }
        if self.max_depth == 0 {
            return Err(WebcompatError::invalid_argument(
                "max_depth",
                "must be positive",
            ));
        }
        if !(self.min_split_gain >= 0.0) {
            return Err(WebcompatError::invalid_argument(
                "min_split_gain",
                "must be non-negative",
            ));
        }
        if !(self.min_child_weight >= 0.0) {
            return Err(WebcompatError::invalid_argument(
                "min_child_weight",
                "must be non-negative",
            ));
        }
        if !(self.reg_lambda >= 0.0) {
            return Err(WebcompatError::invalid_argument(
                "reg_lambda",
                "must be non-negative",
            ));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(WebcompatError::invalid_argument(
                "subsample",
                "must be in (0, 1]",
            ));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(WebcompatError::invalid_argument(
                "colsample_bytree",
                "must be in (0, 1]",
            ));
        }
        if !(2..=usize::from(u16::MAX)).contains(&self.max_bin) {
            return Err(WebcompatError::invalid_argument(
                "max_bin",
                format!("must be in [2, {}]", u16::MAX),
            ));
        }
        Ok(())
    }

    /// XGBoost split gain:
    ///
    /// ```text
    /// 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G²/(H + λ)] - γ
    /// ```
    #[inline]
    pub fn split_gain(
        &self,
        grad_left: f64,
        hess_left: f64,
        grad_right: f64,
        hess_right: f64,
    ) -> f64 {
        let score = |g: f64, h: f64| g * g / (h + self.reg_lambda);
        let parent = score(grad_left + grad_right, hess_left + hess_right);
        0.5 * (score(grad_left, hess_left) + score(grad_right, hess_right) - parent)
            - self.min_split_gain
    }

    #[inline]
    pub fn is_valid_split(&self, hess_left: f64, hess_right: f64) -> bool {
        hess_left >= self.min_child_weight && hess_right >= self.min_child_weight
    }

    /// Shrunk Newton step `-G/(H + λ) · eta`.
    #[inline]
    pub fn leaf_weight(&self, grad_sum: f64, hess_sum: f64) -> f32 {
        (-grad_sum / (hess_sum + self.reg_lambda) * self.learning_rate) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_validate() {
        GbdtParams::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects() {
        let params = GbdtParams {
            subsample: 0.0,
            ..GbdtParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(WebcompatError::InvalidArgument {
                arg: "subsample",
                ..
            })
        ));
        let params = GbdtParams {
            max_bin: 1,
            ..GbdtParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_split_gain() {
        let params = GbdtParams {
            min_split_gain: 0.0,
            ..GbdtParams::default()
        };
        // 0.5 * (100/6 + 100/6 - 0/11)
        assert_relative_eq!(
            16.666_666,
            params.split_gain(10.0, 5.0, -10.0, 5.0),
            epsilon = 1e-5
        );
        let params = GbdtParams::default();
        assert_relative_eq!(
            15.666_666,
            params.split_gain(10.0, 5.0, -10.0, 5.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_leaf_weight() {
        let params = GbdtParams::default();
        assert_relative_eq!(-0.2, params.leaf_weight(3.0, 0.5), epsilon = 1e-6);
        assert_relative_eq!(0.0, params.leaf_weight(0.0, 2.0));
    }

    #[test]
    fn test_is_valid_split() {
        let params = GbdtParams::default();
        assert!(params.is_valid_split(1.0, 2.5));
        assert!(!params.is_valid_split(0.5, 2.5));
    }

    #[test]
    fn test_from_partial_toml() {
        let params: GbdtParams = toml::from_str("max_depth = 3\nsubsample = 1.0\n").unwrap();
        assert_eq!(3, params.max_depth);
        assert_eq!(1.0, params.subsample);
        assert_eq!(10, params.early_stopping_rounds);
    }
}
