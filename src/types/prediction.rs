//! Prediction result data structures

use serde::{Deserialize, Serialize};

/// Qualitative impact of a single feature contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// Ratio of |contribution| to the largest |contribution| at or above which
    /// a reason is labelled high.
    pub const HIGH_RATIO: f64 = 0.5;
    /// Ratio at or above which a reason is labelled medium.
    pub const MEDIUM_RATIO: f64 = 0.2;

    /// Label a contribution relative to the largest absolute contribution of
    /// the same prediction. A zero maximum labels everything low.
    pub fn from_contribution(contribution: f64, max_abs: f64) -> Self {
        let ratio = if max_abs > 0.0 {
            contribution.abs() / max_abs
        } else {
            0.0
        };

        if ratio >= Self::HIGH_RATIO {
            ImpactLevel::High
        } else if ratio >= Self::MEDIUM_RATIO {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }
}

/// Overall review sentiment implied by the prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Positive,
}

/// Whether the attribution step produced a full explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExplanationStatus {
    Complete,
    Degraded { reason: String },
}

/// One ranked factor behind a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    /// Feature name from the contract
    pub factor: String,

    /// Human-readable feature description
    pub description: String,

    /// Value of the feature for this order
    pub feature_value: f64,

    /// Signed contribution to the model margin; positive pushes toward a negative review
    pub contribution: f64,

    /// Qualitative impact relative to the strongest factor
    pub impact: ImpactLevel,

    /// Signed share of the total absolute contribution, in percent
    pub percent: f64,
}

/// Final structured prediction for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Whether the order is predicted to receive a 1-2 star review
    pub is_negative: bool,

    /// Negative-review probability, rounded to 4 decimals
    pub probability: f64,

    /// Coarse review score proxy: 1 when negative, otherwise 5
    pub predicted_score: u8,

    pub sentiment: Sentiment,

    /// Version tag of the trained model artifact
    pub model_version: String,

    /// Explainer baseline (expected margin); contributions sum to margin minus this
    pub base_value: f64,

    /// Factors ranked by descending absolute contribution
    pub reasons: Vec<Reason>,

    pub explanation: ExplanationStatus,
}

impl PredictionResult {
    /// The `n` strongest reasons. Ordering is preserved.
    pub fn top_reasons(&self, n: usize) -> &[Reason] {
        &self.reasons[..n.min(self.reasons.len())]
    }

    /// Copy of this result keeping only the `n` strongest reasons (`0` keeps all).
    pub fn truncated(&self, n: usize) -> Self {
        let mut result = self.clone();
        if n > 0 {
            result.reasons.truncate(n);
        }
        result
    }
}
