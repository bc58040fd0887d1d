//! Result assembly: turns a classification and its attribution into a ranked,
//! labelled prediction result.

use crate::error::ExplanationError;
use crate::features::{text::round_to, FeatureContract, FeatureVector};
use crate::models::explainer::Attribution;
use crate::models::inference::Classification;
use crate::types::prediction::{ExplanationStatus, ImpactLevel, PredictionResult, Reason, Sentiment};

/// Review score reported for a negative prediction.
pub const NEGATIVE_SCORE: u8 = 1;
/// Review score reported for a positive prediction.
pub const POSITIVE_SCORE: u8 = 5;

/// Combines classifier and explainer output into a `PredictionResult`.
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    model_version: String,
}

impl ResultAssembler {
    pub fn new(model_version: impl Into<String>) -> Self {
        Self {
            model_version: model_version.into(),
        }
    }

    /// Build the final result.
    ///
    /// An explanation error does not fail the prediction: the probability is
    /// still reported, with no reasons and a degraded status.
    pub fn assemble(
        &self,
        features: &FeatureVector,
        classification: &Classification,
        attribution: Result<Attribution, ExplanationError>,
    ) -> PredictionResult {
        let (base_value, reasons, explanation) = match attribution {
            Ok(attribution) => (
                attribution.base_value,
                Self::rank_reasons(features, &attribution),
                ExplanationStatus::Complete,
            ),
            Err(e) => (
                0.0,
                Vec::new(),
                ExplanationStatus::Degraded { reason: e.to_string() },
            ),
        };

        let is_negative = classification.is_negative;
        PredictionResult {
            is_negative,
            probability: round_to(classification.probability, 4),
            predicted_score: if is_negative { NEGATIVE_SCORE } else { POSITIVE_SCORE },
            sentiment: if is_negative {
                Sentiment::Negative
            } else {
                Sentiment::Positive
            },
            model_version: self.model_version.clone(),
            base_value,
            reasons,
            explanation,
        }
    }

    /// Label and normalise contributions, keeping the explainer's ordering.
    fn rank_reasons(features: &FeatureVector, attribution: &Attribution) -> Vec<Reason> {
        let contributions = &attribution.contributions;
        let max_abs = contributions.iter().map(|(_, c)| c.abs()).fold(0.0, f64::max);
        let total_abs: f64 = contributions.iter().map(|(_, c)| c.abs()).sum();

        contributions
            .iter()
            .map(|(name, contribution)| Reason {
                factor: name.clone(),
                description: FeatureContract::describe(name).to_string(),
                feature_value: features.get(name).unwrap_or_default(),
                contribution: *contribution,
                impact: ImpactLevel::from_contribution(*contribution, max_abs),
                percent: if total_abs > 0.0 {
                    round_to(contribution / total_abs * 100.0, 1)
                } else {
                    0.0
                },
            })
            .collect()
    }
}
