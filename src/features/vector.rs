//! Ordered, fully populated feature vector.

use crate::error::{PipelineError, Result};
use crate::features::contract::FeatureContract;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::sync::Arc;

/// The 16 model inputs in contract order. Every slot holds a finite value.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Arrange named values in contract order.
    ///
    /// `resolve` is called once per contract name and must produce its value.
    pub fn assemble<F>(contract: &FeatureContract, mut resolve: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<f64>,
    {
        let mut values = Vec::with_capacity(contract.len());
        for name in contract.names() {
            let value = resolve(name)?;
            if !value.is_finite() {
                return Err(PipelineError::contract_mismatch(
                    name.clone(),
                    format!("derived value {value} is not finite"),
                ));
            }
            values.push(value);
        }
        Ok(Self {
            names: contract.shared_names(),
            values,
        })
    }

    /// Build from a caller-supplied name to value map.
    ///
    /// Every contract feature must be present; names outside the contract are rejected.
    pub fn from_named(contract: &FeatureContract, named: &HashMap<String, f64>) -> Result<Self> {
        if let Some(unknown) = named.keys().find(|name| contract.index_of(name).is_none()) {
            return Err(PipelineError::validation(
                unknown.clone(),
                "not a feature of the model contract",
            ));
        }
        Self::assemble(contract, |name| match named.get(name) {
            Some(v) if v.is_finite() => Ok(*v),
            Some(_) => Err(PipelineError::validation(name, "value must be a finite number")),
            None => Err(PipelineError::validation(name, "required feature is missing")),
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
