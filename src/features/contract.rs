//! Feature contract shared by training and serving.
//!
//! The contract is the ordered list of the 16 model inputs. The model artifact,
//! the median table and the feature extractor all have to agree with it, or
//! predictions are meaningless.

use crate::error::{PipelineError, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Number of features the model consumes.
pub const FEATURE_COUNT: usize = 16;

/// Canonical feature order, with a short description of each feature.
pub const FEATURES: [(&str, &str); FEATURE_COUNT] = [
    ("delivery_delta_days", "Days between promised and actual delivery (negative = early)"),
    ("seller_dispatch_days", "Days the seller took to hand the order to the carrier"),
    ("carrier_transit_days", "Days the carrier took to deliver"),
    ("distance_seller_customer_km", "Distance between seller and customer in km"),
    ("price", "Item price (order total minus shipping)"),
    ("freight_value", "Shipping cost"),
    ("payment_value", "Total amount paid"),
    ("payment_installments", "Number of payment installments"),
    ("product_weight_g", "Product weight in grams"),
    ("product_description_lenght", "Length of the product description"),
    ("product_photos_qty", "Number of product photos"),
    ("char_count", "Review length in characters"),
    ("word_count", "Number of words in the review"),
    ("exclamation_count", "Number of '!' in the review"),
    ("question_count", "Number of '?' in the review"),
    ("avg_word_length", "Average word length in the review"),
];

/// Ordered feature contract.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureContract {
    names: Arc<[String]>,
}

impl FeatureContract {
    /// The contract compiled into this build.
    pub fn canonical() -> Self {
        Self {
            names: FEATURES.iter().map(|(name, _)| name.to_string()).collect(),
        }
    }

    /// Build a contract from an ordered name list, checking it against the
    /// canonical one.
    pub fn from_names(names: Vec<String>) -> Result<Self> {
        let canonical = Self::canonical();
        if names.len() != FEATURE_COUNT {
            return Err(PipelineError::contract_mismatch(
                "feature_contract",
                format!("expected {} features, found {}", FEATURE_COUNT, names.len()),
            ));
        }
        for (position, (name, expected)) in names.iter().zip(canonical.names()).enumerate() {
            if name != expected {
                return Err(PipelineError::contract_mismatch(
                    name.clone(),
                    format!("position {position} should be '{expected}'"),
                ));
            }
        }
        Ok(Self { names: names.into() })
    }

    /// Load the contract artifact (a JSON array of names).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::model_load(path.display().to_string(), e.to_string()))?;
        let names: Vec<String> = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::model_load(path.display().to_string(), e.to_string()))?;
        let contract = Self::from_names(names)
            .map_err(|e| PipelineError::model_load(path.display().to_string(), e.to_string()))?;

        info!(path = %path.display(), features = contract.len(), "Feature contract loaded");
        Ok(contract)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn shared_names(&self) -> Arc<[String]> {
        Arc::clone(&self.names)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a feature in the contract.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Human-readable description of a feature.
    pub fn describe(name: &str) -> &'static str {
        FEATURES
            .iter()
            .find(|(feature, _)| *feature == name)
            .map(|(_, description)| *description)
            .unwrap_or("")
    }
}

impl Default for FeatureContract {
    fn default() -> Self {
        Self::canonical()
    }
}
