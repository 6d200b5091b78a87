use bincode::{Decode, Encode};

use crate::vectorizer::SparseEntry;

/// Tree node. Children are indices into [`Tree::nodes`].
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub enum Node {
    /// Rows with `value <= threshold` go left. Absent features read as zero.
    Split {
        feature: u32,
        threshold: f32,
        left: u32,
        right: u32,
    },
    Leaf {
        value: f32,
    },
}

/// Regression tree over sparse rows. The root is node 0.
#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn new(nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    /// A tree with a single leaf.
    pub fn leaf(value: f32) -> Self {
        Self::new(vec![Node::Leaf { value }])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Leaf { .. }))
            .count()
    }

    /// Largest feature index used by a split, if any.
    pub fn max_feature(&self) -> Option<u32> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    /// Checks that the tree has a root and every child index points forward to
    /// an existing node.
    pub(crate) fn is_well_formed(&self) -> bool {
        let n_nodes = self.nodes.len();
        n_nodes > 0
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Split { left, right, .. } => [*left, *right]
                    .iter()
                    .all(|&c| (c as usize) > i && (c as usize) < n_nodes),
                Node::Leaf { .. } => true,
            })
    }

    /// Leaf value reached by a row whose entries are sorted by feature.
    pub fn predict_row(&self, row: &[SparseEntry]) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = feature_value(row, *feature);
                    let next = if v <= *threshold { *left } else { *right };
                    idx = next as usize;
                }
            }
        }
    }
}

#[inline]
fn feature_value(row: &[SparseEntry], feature: u32) -> f32 {
    row.binary_search_by_key(&feature, |&(f, _)| f)
        .map_or(0.0, |i| row[i].1)
}
