//! Gradient boosted regression trees in the XGBoost JSON node layout.

use serde::Deserialize;

use crate::model::ArtifactError;

/// One regression tree stored as parallel node arrays.
///
/// A node is a leaf when its left child is `-1`; the leaf value lives in
/// `base_weights`. Splits send a row left when `x[split_index] < split_condition`.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub left_children: Vec<i32>,
    pub right_children: Vec<i32>,
    pub split_indices: Vec<u32>,
    pub split_conditions: Vec<f64>,
    pub base_weights: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    pub base_score: f64,
    pub feature_names: Vec<String>,
    pub trees: Vec<Tree>,
}

impl Tree {
    fn num_nodes(&self) -> usize {
        self.left_children.len()
    }

    fn check(&self, tree: usize, num_features: usize) -> Result<(), ArtifactError> {
        let num_nodes = self.num_nodes();
        if num_nodes == 0 {
            return Err(ArtifactError::EmptyTree(tree));
        }
        let lengths = [
            self.right_children.len(),
            self.split_indices.len(),
            self.split_conditions.len(),
            self.base_weights.len(),
        ];
        if lengths.iter().any(|&len| len != num_nodes) {
            return Err(ArtifactError::RaggedTree(tree));
        }

        for node in 0..num_nodes {
            let left = self.left_children[node];
            if left == -1 {
                continue;
            }
            let right = self.right_children[node];
            for child in [left, right] {
                // Children always follow their parent, which also rules out cycles.
                if child <= node as i32 || child as usize >= num_nodes {
                    return Err(ArtifactError::InvalidNodeIndex {
                        tree,
                        node,
                        child,
                        num_nodes,
                    });
                }
            }
            let split = self.split_indices[node] as usize;
            if split >= num_features {
                return Err(ArtifactError::InvalidSplitFeature {
                    tree,
                    node,
                    feature: split,
                    num_features,
                });
            }
        }
        Ok(())
    }

    fn predict_row(&self, features: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            let left = self.left_children[node];
            if left == -1 {
                return self.base_weights[node];
            }
            let value = features[self.split_indices[node] as usize];
            node = if value < self.split_conditions[node] {
                left as usize
            } else {
                self.right_children[node] as usize
            };
        }
    }
}

impl TreeEnsemble {
    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Checks structural soundness so that `predict_row` cannot index out of bounds.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.trees.is_empty() {
            return Err(ArtifactError::EmptyEnsemble);
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.check(idx, self.num_features())?;
        }
        Ok(())
    }

    /// Sum of leaf values plus the base score. `features` must have
    /// `num_features()` entries.
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.predict_row(features))
    }
}
