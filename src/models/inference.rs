//! Negative-review classifier

use crate::features::FeatureVector;
use crate::models::loader::LoadedModel;
use crate::models::tree::{sigmoid, TreeEnsemble};
use std::sync::Arc;
use tracing::debug;

/// Probability at or above which an order is labelled negative.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Output of one classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Raw model output before the logistic link
    pub margin: f64,
    /// Negative-review probability at full precision
    pub probability: f64,
    pub is_negative: bool,
}

/// Binary classifier over the feature contract.
///
/// Holds the loaded ensemble behind an `Arc`; the model is immutable after load
/// so concurrent callers need no locking.
#[derive(Debug, Clone)]
pub struct Classifier {
    ensemble: Arc<TreeEnsemble>,
    version: String,
}

impl Classifier {
    pub fn new(model: LoadedModel) -> Self {
        Self {
            version: model.version,
            ensemble: Arc::new(model.ensemble),
        }
    }

    /// Run inference on a feature vector.
    pub fn predict(&self, features: &FeatureVector) -> Classification {
        let margin = self.ensemble.margin(features.values());
        let probability = sigmoid(margin);
        let is_negative = probability >= DECISION_THRESHOLD;

        debug!(
            margin = margin,
            probability = probability,
            is_negative = is_negative,
            "Inference complete"
        );

        Classification {
            margin,
            probability,
            is_negative,
        }
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    /// Model version tag
    pub fn version(&self) -> &str {
        &self.version
    }
}
