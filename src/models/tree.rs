//! Gradient-boosted tree ensemble
//!
//! Trees are stored as flat node arrays with the root at index 0. A sample goes
//! left when `value < threshold`; NaN follows the node's default direction.

use serde::{Deserialize, Serialize};

/// Only supported training objective: logistic loss on a binary target.
pub const BINARY_LOGISTIC: &str = "binary:logistic";

/// A decision tree node (split or leaf)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        /// Feature index into the contract-ordered input
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Direction taken by missing (NaN) values
        #[serde(default = "default_true")]
        default_left: bool,
        /// Sum of training hessians that reached this node
        #[serde(default)]
        cover: f64,
    },
    Leaf {
        value: f64,
        #[serde(default)]
        cover: f64,
    },
}

fn default_true() -> bool {
    true
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } | Node::Leaf { cover, .. } => *cover,
        }
    }
}

/// A single regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Index of the child a sample follows at a split node.
    #[inline]
    pub fn next_node(node: &Node, features: &[f64]) -> Option<usize> {
        match node {
            Node::Split {
                feature,
                threshold,
                left,
                right,
                default_left,
                ..
            } => {
                let value = features[*feature];
                let go_left = if value.is_nan() { *default_left } else { value < *threshold };
                Some(if go_left { *left } else { *right })
            }
            Node::Leaf { .. } => None,
        }
    }

    /// Leaf value reached by a sample.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            match Self::next_node(node, features) {
                Some(next) => idx = next,
                None => {
                    if let Node::Leaf { value, .. } = node {
                        return *value;
                    }
                    return 0.0;
                }
            }
        }
    }

    /// Check node links and indices. Children must come after their parent,
    /// which rules out cycles.
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= feature_count {
                        return Err(format!(
                            "node {idx} splits on feature {feature} \
                             but only {feature_count} features exist"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} links to invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} has a non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Maximum root-to-leaf depth (root = 0).
    pub fn depth(&self) -> usize {
        fn walk(tree: &Tree, idx: usize) -> usize {
            match &tree.nodes[idx] {
                Node::Split { left, right, .. } => 1 + walk(tree, *left).max(walk(tree, *right)),
                Node::Leaf { .. } => 0,
            }
        }
        walk(self, 0)
    }
}

/// Complete boosted ensemble as stored in the model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    /// Artifact version tag
    pub version: String,
    /// Training objective
    #[serde(default = "default_objective")]
    pub objective: String,
    /// Margin before any tree is added
    #[serde(default)]
    pub base_margin: f64,
    /// Feature names in the order the model was trained on
    pub feature_names: Vec<String>,
    pub trees: Vec<Tree>,
}

fn default_objective() -> String {
    BINARY_LOGISTIC.to_string()
}

impl TreeEnsemble {
    /// Raw (pre-sigmoid) model output.
    pub fn margin(&self, features: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|tree| tree.evaluate(features)).sum::<f64>()
    }

    /// Structural validation of every tree.
    pub fn validate(&self) -> Result<(), String> {
        if self.objective != BINARY_LOGISTIC {
            return Err(format!("unsupported objective '{}'", self.objective));
        }
        if !self.base_margin.is_finite() {
            return Err("base_margin is not finite".to_string());
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|e| format!("tree {idx}: {e}"))?;
        }
        Ok(())
    }
}

/// Logistic link, clamped so extreme margins stay inside [0, 1].
pub fn sigmoid(margin: f64) -> f64 {
    (1.0 / (1.0 + (-margin).exp())).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: f64, right: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left: true,
                    cover: 10.0,
                },
                Node::Leaf { value: left, cover: 6.0 },
                Node::Leaf { value: right, cover: 4.0 },
            ],
        }
    }

    #[test]
    fn test_eval_tree_branches() {
        let tree = stump(0, 50.0, 10.0, 20.0);
        assert_eq!(tree.evaluate(&[30.0]), 10.0);
        assert_eq!(tree.evaluate(&[60.0]), 20.0);
        // Equal to threshold goes right
        assert_eq!(tree.evaluate(&[50.0]), 20.0);
        // Missing follows default direction
        assert_eq!(tree.evaluate(&[f64::NAN]), 10.0);
    }

    #[test]
    fn test_margin_sums_trees_and_base() {
        let ensemble = TreeEnsemble {
            version: "test".to_string(),
            objective: BINARY_LOGISTIC.to_string(),
            base_margin: -0.5,
            feature_names: vec!["a".to_string(), "b".to_string()],
            trees: vec![stump(0, 1.0, -1.0, 1.0), stump(1, 1.0, 0.25, 0.75)],
        };

        assert!((ensemble.margin(&[0.0, 2.0]) - (-0.5 - 1.0 + 0.75)).abs() < 1e-12);
        assert!((ensemble.margin(&[2.0, 0.0]) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(sigmoid(-1000.0) >= 0.0);
    }

    #[test]
    fn test_validate_rejects_backward_link() {
        let mut tree = stump(0, 1.0, 0.0, 1.0);
        if let Node::Split { right, .. } = &mut tree.nodes[0] {
            *right = 0;
        }
        assert!(tree.validate(1).unwrap_err().contains("invalid child"));
    }

    #[test]
    fn test_validate_rejects_feature_out_of_range() {
        let tree = stump(3, 1.0, 0.0, 1.0);
        assert!(tree.validate(2).is_err());
        assert!(tree.validate(4).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_objective() {
        let ensemble = TreeEnsemble {
            version: "test".to_string(),
            objective: "reg:squarederror".to_string(),
            base_margin: 0.0,
            feature_names: vec!["a".to_string()],
            trees: vec![stump(0, 1.0, 0.0, 1.0)],
        };
        assert!(ensemble.validate().unwrap_err().contains("objective"));
    }

    #[test]
    fn test_node_json_format() {
        let json = r#"{
            "kind": "split", "feature": 2, "threshold": 12.5,
            "left": 1, "right": 2, "cover": 300.0
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(
            node,
            Node::Split {
                feature: 2,
                threshold: 12.5,
                left: 1,
                right: 2,
                default_left: true,
                cover: 300.0
            }
        );
        assert_eq!(stump(0, 1.0, 0.0, 1.0).depth(), 1);
    }
}
