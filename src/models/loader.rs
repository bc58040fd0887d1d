//! Trained model artifact loader

use crate::error::{PipelineError, Result};
use crate::features::FeatureContract;
use crate::models::tree::TreeEnsemble;
use std::path::Path;
use tracing::info;

/// Loaded model with metadata
#[derive(Debug, Clone)]
pub struct LoadedModel {
    /// Artifact path the model was read from
    pub path: String,
    /// Version tag of the artifact
    pub version: String,
    /// Validated tree ensemble
    pub ensemble: TreeEnsemble,
}

/// Loader for tree-ensemble model artifacts
pub struct ModelLoader {
    contract: FeatureContract,
}

impl ModelLoader {
    /// Create a loader that checks artifacts against `contract`.
    pub fn new(contract: FeatureContract) -> Self {
        Self { contract }
    }

    /// Load a model artifact from a JSON file.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        let source = path.display().to_string();

        info!(path = %source, "Loading model artifact");

        let raw =
            std::fs::read(path).map_err(|e| PipelineError::model_load(&source, e.to_string()))?;
        self.load_from_slice(&source, &raw)
    }

    /// Parse and validate a model artifact already in memory.
    pub fn load_from_slice(&self, source: &str, raw: &[u8]) -> Result<LoadedModel> {
        let ensemble: TreeEnsemble = serde_json::from_slice(raw)
            .map_err(|e| PipelineError::model_load(source, e.to_string()))?;

        ensemble
            .validate()
            .map_err(|e| PipelineError::model_load(source, e))?;

        // Train/serve parity: same names, same order
        if ensemble.feature_names.as_slice() != self.contract.names() {
            return Err(PipelineError::model_load(
                source,
                format!(
                    "model features {:?} do not match the feature contract {:?}",
                    ensemble.feature_names,
                    self.contract.names()
                ),
            ));
        }

        let max_depth = ensemble.trees.iter().map(|t| t.depth()).max().unwrap_or(0);
        info!(
            path = %source,
            version = %ensemble.version,
            trees = ensemble.trees.len(),
            max_depth = max_depth,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            path: source.to_string(),
            version: ensemble.version.clone(),
            ensemble,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(FeatureContract::canonical())
    }
}
