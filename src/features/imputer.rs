//! Median imputer: per-feature fallback values fitted on the training set.

use crate::error::{PipelineError, Result};
use crate::features::contract::FeatureContract;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Read-only table of training-time feature medians.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedianImputer {
    medians: BTreeMap<String, f64>,
}

impl MedianImputer {
    pub fn new(medians: BTreeMap<String, f64>) -> Self {
        Self { medians }
    }

    /// Load the median table artifact (flat JSON object of name to float).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::model_load(&source, e.to_string()))?;
        let medians: BTreeMap<String, f64> = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::model_load(&source, e.to_string()))?;

        if let Some((name, _)) = medians.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::model_load(
                &source,
                format!("median for '{name}' is not finite"),
            ));
        }

        info!(path = %source, count = medians.len(), "Median table loaded");
        Ok(Self { medians })
    }

    /// Fit medians over training feature rows laid out in contract order.
    ///
    /// Non-finite entries are skipped; a feature with no finite values gets no median.
    pub fn fit(contract: &FeatureContract, rows: &[Vec<f64>]) -> Self {
        let mut medians = BTreeMap::new();
        for (column, name) in contract.names().iter().enumerate() {
            let mut values: Vec<f64> = rows
                .iter()
                .filter_map(|row| row.get(column).copied())
                .filter(|v| v.is_finite())
                .collect();
            if let Some(median) = median(&mut values) {
                medians.insert(name.clone(), median);
            }
        }
        Self { medians }
    }

    /// Median for a feature, if one was fitted.
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.medians.get(feature).copied()
    }

    /// Median for a feature, else the explicit fallback, else a contract mismatch.
    pub fn value_or(&self, feature: &str, fallback: Option<f64>) -> Result<f64> {
        self.get(feature).or(fallback).ok_or_else(|| {
            PipelineError::contract_mismatch(
                feature,
                "no trained median and no fallback for missing input",
            )
        })
    }

    /// Log contract names without a median and medians outside the contract.
    ///
    /// Returns the contract names that have no median.
    pub fn audit(&self, contract: &FeatureContract) -> Vec<String> {
        let missing: Vec<String> = contract
            .names()
            .iter()
            .filter(|name| !self.medians.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in &missing {
            warn!(feature = %name, "Median table has no entry for contract feature");
        }
        for name in self.medians.keys() {
            if contract.index_of(name).is_none() {
                warn!(feature = %name, "Median table entry is not part of the feature contract");
            }
        }
        missing
    }

    pub fn len(&self) -> usize {
        self.medians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medians.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| PipelineError::Config(e.to_string()))
    }
}

/// Median with even counts averaging the middle pair.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
