//! Depth-wise tree growth over gradient histograms.

use std::collections::VecDeque;
use std::ops::{Add, AddAssign, Sub};

use crate::gbdt::binning::{BinCuts, BinnedMatrix};
use crate::gbdt::params::GbdtParams;
use crate::gbdt::tree::{Node, Tree};

/// First and second order gradients of one row or a sum of rows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct GradPair {
    pub grad: f64,
    pub hess: f64,
}

impl GradPair {
    pub(crate) fn new(grad: f64, hess: f64) -> Self {
        Self { grad, hess }
    }
}

impl Add for GradPair {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.grad + rhs.grad, self.hess + rhs.hess)
    }
}

impl Sub for GradPair {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.grad - rhs.grad, self.hess - rhs.hess)
    }
}

impl AddAssign for GradPair {
    fn add_assign(&mut self, rhs: Self) {
        self.grad += rhs.grad;
        self.hess += rhs.hess;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SplitCandidate {
    feature: u32,
    bin: usize,
    gain: f64,
}

struct NodeTask {
    node: usize,
    depth: usize,
    rows: Vec<u32>,
    sum: GradPair,
    hist: Vec<GradPair>,
}

/// Grows one tree per boosting round.
pub(crate) struct TreeGrower<'a> {
    params: &'a GbdtParams,
    cuts: &'a BinCuts,
    binned: &'a BinnedMatrix,

    #[cfg(test)]
    n_histograms: std::cell::Cell<usize>,
}

impl<'a> TreeGrower<'a> {
    pub(crate) fn new(params: &'a GbdtParams, cuts: &'a BinCuts, binned: &'a BinnedMatrix) -> Self {
        Self {
            params,
            cuts,
            binned,
            #[cfg(test)]
            n_histograms: std::cell::Cell::new(0),
        }
    }

    /// Fits a tree to the gradients of the sampled `rows`, splitting only on
    /// `features`.
    ///
    /// Only nodes above `max_depth` get a histogram; children at the depth
    /// limit are written as leaves right away.
    pub(crate) fn grow(&self, rows: Vec<u32>, features: &[u32], grads: &[GradPair]) -> Tree {
        let sum = rows
            .iter()
            .fold(GradPair::default(), |acc, &i| acc + grads[i as usize]);
        if self.params.max_depth == 0 {
            return Tree::leaf(self.params.leaf_weight(sum.grad, sum.hess));
        }
        let hist = self.build_histogram(&rows, grads, sum);
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut queue = VecDeque::new();
        queue.push_back(NodeTask {
            node: 0,
            depth: 0,
            rows,
            sum,
            hist,
        });

        while let Some(task) = queue.pop_front() {
            let Some(split) = self.find_best_split(&task, features) else {
                nodes[task.node] = Node::Leaf {
                    value: self.params.leaf_weight(task.sum.grad, task.sum.hess),
                };
                continue;
            };

            let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = task
                .rows
                .iter()
                .partition(|&&i| {
                    usize::from(self.binned.bin(i as usize, split.feature)) <= split.bin
                });
            let left_sum = left_rows
                .iter()
                .fold(GradPair::default(), |acc, &i| acc + grads[i as usize]);
            let right_sum = task.sum - left_sum;

            let left = nodes.len();
            let right = left + 1;
            nodes[task.node] = Node::Split {
                feature: split.feature,
                threshold: self.cuts.threshold(split.feature as usize, split.bin),
                left: left as u32,
                right: right as u32,
            };
            let depth = task.depth + 1;
            if depth >= self.params.max_depth {
                nodes.push(Node::Leaf {
                    value: self.params.leaf_weight(left_sum.grad, left_sum.hess),
                });
                nodes.push(Node::Leaf {
                    value: self.params.leaf_weight(right_sum.grad, right_sum.hess),
                });
                continue;
            }

            let (left_hist, right_hist) = if left_rows.len() <= right_rows.len() {
                let small = self.build_histogram(&left_rows, grads, left_sum);
                let large = subtract(&task.hist, &small);
                (small, large)
            } else {
                let small = self.build_histogram(&right_rows, grads, right_sum);
                let large = subtract(&task.hist, &small);
                (large, small)
            };

            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            queue.push_back(NodeTask {
                node: left,
                depth,
                rows: left_rows,
                sum: left_sum,
                hist: left_hist,
            });
            queue.push_back(NodeTask {
                node: right,
                depth,
                rows: right_rows,
                sum: right_sum,
                hist: right_hist,
            });
        }
        Tree::new(nodes)
    }

    /// Flat histogram of all features. Bin 0 is derived from the node total.
    fn build_histogram(&self, rows: &[u32], grads: &[GradPair], sum: GradPair) -> Vec<GradPair> {
        #[cfg(test)]
        self.n_histograms.set(self.n_histograms.get() + 1);
        let mut hist = vec![GradPair::default(); self.cuts.total_bins()];
        for &i in rows {
            let gp = grads[i as usize];
            for &(f, bin) in self.binned.row(i as usize) {
                hist[self.cuts.offset(f as usize) + usize::from(bin)] += gp;
            }
        }
        for f in 0..self.cuts.n_features() {
            let offset = self.cuts.offset(f);
            let nonzero = hist[offset + 1..offset + self.cuts.n_bins(f)]
                .iter()
                .fold(GradPair::default(), |acc, &gp| acc + gp);
            hist[offset] = sum - nonzero;
        }
        hist
    }

    fn find_best_split(&self, task: &NodeTask, features: &[u32]) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        for &f in features {
            let offset = self.cuts.offset(f as usize);
            let n_bins = self.cuts.n_bins(f as usize);
            let mut left = GradPair::default();
            for bin in 0..n_bins.saturating_sub(1) {
                left += task.hist[offset + bin];
                let right = task.sum - left;
                if !self.params.is_valid_split(left.hess, right.hess) {
                    continue;
                }
                let gain = self
                    .params
                    .split_gain(left.grad, left.hess, right.grad, right.hess);
                if gain > 0.0 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature: f,
                        bin,
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn subtract(parent: &[GradPair], child: &[GradPair]) -> Vec<GradPair> {
    parent.iter().zip(child).map(|(&p, &c)| p - c).collect()
}
