//! Histogram-based gradient-boosted trees for binary classification.
//!
//! Trees are grown depth-wise on quantized sparse rows. Leaf weights follow
//! the second order (XGBoost style) update with L2 regularization.

mod booster;
mod params;
mod tree;

#[cfg(feature = "train")]
mod binning;
#[cfg(feature = "train")]
mod callback;
#[cfg(feature = "train")]
mod grower;
#[cfg(feature = "train")]
mod objective;
#[cfg(feature = "train")]
mod trainer;

pub use booster::{Booster, DECISION_THRESHOLD};
pub use params::GbdtParams;
pub use tree::{Node, Tree};

#[cfg(feature = "train")]
pub use callback::EarlyStopping;
#[cfg(feature = "train")]
pub use objective::logloss;
#[cfg(feature = "train")]
pub use trainer::{EvalSet, GbdtTrainer};
