//! Prediction pipeline: order record to explained prediction.
//!
//! `ReviewRiskPipeline` owns every artifact the request path needs. It is built
//! once at startup and shared read-only (typically behind an `Arc`); no request
//! mutates it.

use crate::config::ArtifactsConfig;
use crate::error::Result;
use crate::feature_extractor::FeatureExtractor;
use crate::features::{FeatureContract, FeatureVector, MedianImputer};
use crate::models::{Classifier, LoadedModel, ModelLoader, ResultAssembler, TreeExplainer};
use crate::types::order::OrderRecord;
use crate::types::prediction::{ExplanationStatus, PredictionResult};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Immutable prediction context
pub struct ReviewRiskPipeline {
    extractor: FeatureExtractor,
    classifier: Classifier,
    explainer: TreeExplainer,
    assembler: ResultAssembler,
}

impl ReviewRiskPipeline {
    /// Load contract, median table and model from the configured artifact paths.
    ///
    /// Any failure here is fatal: the service must not serve without a model.
    pub fn from_artifacts(artifacts: &ArtifactsConfig) -> Result<Self> {
        let contract = FeatureContract::load(&artifacts.contract_path)?;
        let imputer = MedianImputer::load(&artifacts.medians_path)?;
        let model = ModelLoader::new(contract.clone()).load_model(&artifacts.model_path)?;
        Ok(Self::new(contract, imputer, model))
    }

    /// Assemble a pipeline from already loaded parts.
    pub fn new(contract: FeatureContract, imputer: MedianImputer, model: LoadedModel) -> Self {
        let missing = imputer.audit(&contract);
        if !missing.is_empty() {
            warn!(
                missing = ?missing,
                "Median table is incomplete; orders missing these inputs will be rejected"
            );
        }

        let assembler = ResultAssembler::new(model.version.clone());
        let classifier = Classifier::new(model);

        info!(
            model_version = %classifier.version(),
            features = contract.len(),
            medians = imputer.len(),
            "Prediction pipeline initialized"
        );

        Self {
            extractor: FeatureExtractor::new(contract, imputer),
            classifier,
            explainer: TreeExplainer::new(),
            assembler,
        }
    }

    /// Predict and explain one order.
    pub fn predict(&self, order: &OrderRecord) -> Result<PredictionResult> {
        let validated = order.validate()?;
        let features = self.extractor.extract(&validated)?;
        Ok(self.predict_vector(&features))
    }

    /// Predict from a caller-built feature map keyed by contract names.
    pub fn predict_features(&self, named: &HashMap<String, f64>) -> Result<PredictionResult> {
        let features = FeatureVector::from_named(self.extractor.contract(), named)?;
        Ok(self.predict_vector(&features))
    }

    /// Predict a batch of orders; each record succeeds or fails on its own.
    pub fn predict_batch(&self, orders: &[OrderRecord]) -> Vec<Result<PredictionResult>> {
        orders.iter().map(|order| self.predict(order)).collect()
    }

    /// Build the feature vector for an order without running the model.
    pub fn features(&self, order: &OrderRecord) -> Result<FeatureVector> {
        self.extractor.extract(&order.validate()?)
    }

    fn predict_vector(&self, features: &FeatureVector) -> PredictionResult {
        let classification = self.classifier.predict(features);
        let attribution = self.explainer.explain(features, self.classifier.ensemble());
        if let Err(e) = &attribution {
            warn!(error = %e, "Explanation unavailable, returning degraded result");
        }

        let result = self.assembler.assemble(features, &classification, attribution);
        debug!(
            probability = result.probability,
            is_negative = result.is_negative,
            degraded = matches!(result.explanation, ExplanationStatus::Degraded { .. }),
            "Prediction assembled"
        );
        result
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    pub fn contract(&self) -> &FeatureContract {
        self.extractor.contract()
    }
}

impl std::fmt::Debug for ReviewRiskPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewRiskPipeline")
            .field("model_version", &self.model_version())
            .field("features", &self.contract().len())
            .finish()
    }
}
