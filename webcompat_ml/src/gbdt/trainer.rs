use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info};

use crate::errors::{Result, WebcompatError};
use crate::feature::FeatureMatrix;
use crate::gbdt::binning::{BinCuts, BinnedMatrix};
use crate::gbdt::booster::Booster;
use crate::gbdt::callback::EarlyStopping;
use crate::gbdt::grower::TreeGrower;
use crate::gbdt::objective;
use crate::gbdt::params::GbdtParams;

/// Held-out rows monitored for early stopping.
#[derive(Clone, Copy, Debug)]
pub struct EvalSet<'a> {
    pub features: &'a FeatureMatrix,

    /// Binary targets in {0, 1}.
    pub labels: &'a [f32],
}

/// Partial Fisher-Yates draw of `k` distinct indices below `n`, sorted.
pub(crate) fn sample_without_replacement<R>(n: usize, k: usize, rng: &mut R) -> Vec<u32>
where
    R: Rng,
{
    let k = k.min(n);
    let mut indices: Vec<u32> = (0..n as u32).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// Trainer of [`Booster`] ensembles with a logistic objective.
#[derive(Clone, Debug, Default)]
pub struct GbdtTrainer {
    params: GbdtParams,
}

impl GbdtTrainer {
    pub fn new(params: GbdtParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Trains an ensemble.
    ///
    /// With an evaluation set and a positive `early_stopping_rounds`, training
    /// stops once the evaluation log-loss has not improved for that many
    /// rounds, and the returned booster holds the trees up to the best round.
    ///
    /// # Errors
    ///
    /// - [`WebcompatError::InvalidArgument`] for out-of-range parameters or
    ///   label counts that disagree with the row counts.
    /// - [`WebcompatError::InsufficientData`] when `features` has no rows.
    /// - [`WebcompatError::FeatureWidthMismatch`] when the evaluation rows have
    ///   a different width.
    pub fn train(
        &self,
        features: &FeatureMatrix,
        labels: &[f32],
        eval: Option<EvalSet>,
    ) -> Result<Booster> {
        let params = &self.params;
        params.validate()?;
        let n_rows = features.n_rows();
        if n_rows == 0 {
            return Err(WebcompatError::insufficient_data("no training rows"));
        }
        if labels.len() != n_rows {
            return Err(WebcompatError::invalid_argument(
                "labels",
                format!("{} labels for {} rows", labels.len(), n_rows),
            ));
        }
        if let Some(eval) = &eval {
            crate::feature::check_width(features.n_features(), eval.features.n_features())?;
            if eval.labels.len() != eval.features.n_rows() {
                return Err(WebcompatError::invalid_argument(
                    "eval",
                    format!(
                        "{} labels for {} rows",
                        eval.labels.len(),
                        eval.features.n_rows()
                    ),
                ));
            }
        }

        let n_features = features.n_features();
        let cuts = BinCuts::from_matrix(features, params.max_bin);
        let binned = BinnedMatrix::new(features, &cuts);
        let grower = TreeGrower::new(params, &cuts, &binned);

        let base_margin = objective::base_margin(labels);
        let mut margins = vec![f64::from(base_margin); n_rows];
        let mut eval_margins = eval
            .as_ref()
            .map(|e| vec![f64::from(base_margin); e.features.n_rows()]);
        let mut early_stopping = match &eval {
            Some(e) if params.early_stopping_rounds > 0 && e.features.n_rows() > 0 => {
                Some(EarlyStopping::new(params.early_stopping_rounds))
            }
            _ => None,
        };

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);
        let n_sampled_rows = ((n_rows as f64 * params.subsample).round() as usize).max(1);
        let n_sampled_features = if n_features == 0 {
            0
        } else {
            ((n_features as f64 * params.colsample_bytree).ceil() as usize).clamp(1, n_features)
        };

        let mut trees = Vec::with_capacity(params.n_rounds);
        for round in 0..params.n_rounds {
            let grads = objective::gradients(&margins, labels);
            let rows = sample_without_replacement(n_rows, n_sampled_rows, &mut rng);
            let columns = sample_without_replacement(n_features, n_sampled_features, &mut rng);
            let tree = grower.grow(rows, &columns, &grads);

            for (m, row) in margins.iter_mut().zip(features.rows()) {
                *m += f64::from(tree.predict_row(row));
            }
            if let (Some(eval), Some(eval_margins)) = (&eval, eval_margins.as_mut()) {
                for (m, row) in eval_margins.iter_mut().zip(eval.features.rows()) {
                    *m += f64::from(tree.predict_row(row));
                }
            }
            trees.push(tree);

            let eval_loss = match (&eval, &eval_margins) {
                (Some(eval), Some(eval_margins)) => {
                    Some(objective::logloss(eval_margins, eval.labels))
                }
                _ => None,
            };
            debug!(
                round,
                train_logloss = objective::logloss(&margins, labels),
                eval_logloss = eval_loss,
                "boosting round"
            );
            if let (Some(es), Some(loss)) = (early_stopping.as_mut(), eval_loss) {
                if es.should_stop(loss) {
                    info!(
                        round,
                        best_round = es.best_round(),
                        best_logloss = es.best_value(),
                        "early stopping"
                    );
                    break;
                }
            }
        }

        let best_iteration = early_stopping.map(|es| es.best_round());
        if let Some(best) = best_iteration {
            trees.truncate(best + 1);
        }
        info!(
            n_trees = trees.len(),
            n_features,
            ?best_iteration,
            "trained boosted trees"
        );
        Ok(Booster::new(n_features, base_margin, trees, best_iteration))
    }
}
