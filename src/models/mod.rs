//! ML model inference components

pub mod assembler;
pub mod explainer;
pub mod inference;
pub mod loader;
pub mod tree;

pub use assembler::ResultAssembler;
pub use explainer::{Attribution, TreeExplainer};
pub use inference::{Classification, Classifier, DECISION_THRESHOLD};
pub use loader::{LoadedModel, ModelLoader};
pub use tree::{Node, Tree, TreeEnsemble};

/// Small ensemble over the canonical contract, mirroring `artifacts/review_model.json`.
#[cfg(test)]
pub(crate) mod fixtures {
    use super::tree::{Node, Tree, TreeEnsemble, BINARY_LOGISTIC};
    use crate::features::FeatureContract;

    fn split(feature: usize, threshold: f64, left: usize, right: usize, cover: f64) -> Node {
        Node::Split {
            feature,
            threshold,
            left,
            right,
            default_left: true,
            cover,
        }
    }

    fn leaf(value: f64, cover: f64) -> Node {
        Node::Leaf { value, cover }
    }

    pub fn ensemble() -> TreeEnsemble {
        TreeEnsemble {
            version: "1.0.0".to_string(),
            objective: BINARY_LOGISTIC.to_string(),
            base_margin: -1.2,
            feature_names: FeatureContract::canonical().names().to_vec(),
            trees: vec![
                // delivery delay, then seller dispatch time
                Tree {
                    nodes: vec![
                        split(0, 0.5, 1, 2, 1000.0),
                        split(1, 4.5, 3, 4, 850.0),
                        split(0, 7.5, 5, 6, 150.0),
                        leaf(-0.45, 700.0),
                        leaf(0.05, 150.0),
                        leaf(0.6, 100.0),
                        leaf(1.1, 50.0),
                    ],
                },
                // review length, then exclamation marks
                Tree {
                    nodes: vec![
                        split(12, 2.5, 1, 2, 1000.0),
                        leaf(-0.2, 550.0),
                        split(13, 1.5, 3, 4, 450.0),
                        leaf(0.1, 380.0),
                        leaf(0.45, 70.0),
                    ],
                },
                // freight, distance and carrier transit
                Tree {
                    nodes: vec![
                        split(5, 30.0, 1, 2, 1000.0),
                        split(3, 900.0, 3, 4, 700.0),
                        split(2, 12.5, 5, 6, 300.0),
                        leaf(-0.1, 500.0),
                        leaf(0.08, 200.0),
                        leaf(0.12, 220.0),
                        leaf(0.35, 80.0),
                    ],
                },
                // questions in the review combined with a late delivery
                Tree {
                    nodes: vec![
                        split(14, 0.5, 1, 2, 1000.0),
                        leaf(-0.05, 900.0),
                        split(0, 0.5, 3, 4, 100.0),
                        leaf(0.2, 60.0),
                        leaf(0.5, 40.0),
                    ],
                },
            ],
        }
    }
}
