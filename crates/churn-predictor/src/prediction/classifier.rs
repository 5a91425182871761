//! In-process classifiers.
//!
//! The bundled model format is a random forest exported from the training
//! notebook as JSON. Each tree is a flat node list; node 0 is the root.
//!
//! ```json
//! {
//!   "n_features": 3,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 0, "threshold": 0.5, "left": 1, "right": 2 },
//!         { "value": [8.0, 2.0] },
//!         { "value": [1.0, 9.0] }
//!     ] }
//!   ]
//! }
//! ```

use crate::prediction::error::{ModelError, ScoringError};
use crate::prediction::verdict::ClassOutput;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// A model that scores one aligned row.
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &[f64]) -> Result<ClassOutput, ScoringError>;

    /// Row width the model was trained on, when it is known.
    fn feature_count(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: [f64; 2],
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
struct ForestArtifact {
    n_features: usize,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let forest = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            trees = forest.tree_count(),
            features = forest.n_features,
            "random forest loaded"
        );
        Ok(forest)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let artifact: ForestArtifact = serde_json::from_str(raw)?;
        if artifact.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".to_string()));
        }
        for (tree_index, tree) in artifact.trees.iter().enumerate() {
            validate_tree(tree_index, tree, artifact.n_features)?;
        }
        Ok(Self {
            n_features: artifact.n_features,
            trees: artifact.trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn classify(&self, features: &[f64]) -> Result<ClassOutput, ScoringError> {
        if features.len() != self.n_features {
            return Err(ScoringError::DimensionMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let mut totals = [0.0_f64; 2];
        for tree in &self.trees {
            let leaf = descend(tree, features);
            let weight = leaf[0] + leaf[1];
            if weight > 0.0 {
                totals[0] += leaf[0] / weight;
                totals[1] += leaf[1] / weight;
            }
        }

        let count = self.trees.len() as f64;
        let churn_probability = totals[1] / count;
        let stay_probability = totals[0] / count;
        let label = i64::from(churn_probability > stay_probability);

        Ok(ClassOutput {
            label,
            churn_probability: Some(churn_probability.clamp(0.0, 1.0)),
        })
    }

    fn feature_count(&self) -> Option<usize> {
        Some(self.n_features)
    }
}

fn descend<'a>(tree: &'a Tree, features: &[f64]) -> &'a [f64; 2] {
    let mut index = 0;
    loop {
        match &tree.nodes[index] {
            TreeNode::Leaf { value } => return value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                index = if features[*feature] <= *threshold {
                    *left
                } else {
                    *right
                };
            }
        }
    }
}

/// Child indices must point strictly forward so descent always terminates.
fn validate_tree(tree_index: usize, tree: &Tree, n_features: usize) -> Result<(), ModelError> {
    if tree.nodes.is_empty() {
        return Err(ModelError::Invalid(format!("tree {tree_index} has no nodes")));
    }
    for (node_index, node) in tree.nodes.iter().enumerate() {
        match node {
            TreeNode::Split {
                feature,
                left,
                right,
                threshold,
            } => {
                if *feature >= n_features {
                    return Err(ModelError::Invalid(format!(
                        "tree {tree_index} node {node_index} splits on feature {feature} but the model has {n_features}"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ModelError::Invalid(format!(
                        "tree {tree_index} node {node_index} has a non-finite threshold"
                    )));
                }
                for child in [*left, *right] {
                    if child <= node_index || child >= tree.nodes.len() {
                        return Err(ModelError::Invalid(format!(
                            "tree {tree_index} node {node_index} points at invalid child {child}"
                        )));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                if value.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
                    return Err(ModelError::Invalid(format!(
                        "tree {tree_index} leaf {node_index} has invalid class weights"
                    )));
                }
            }
        }
    }
    Ok(())
}
