//! Error taxonomy for the review-risk pipeline.
//!
//! Request-level failures (`Validation`, `ContractMismatch`) are kept apart from
//! startup failures (`ModelLoad`, `Config`) so callers and operators can tell a bad
//! request from a stale or broken deployment.

use thiserror::Error;

/// Errors produced by the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing input field. Client-side error.
    #[error("invalid input for {field}: {message}")]
    Validation { field: String, message: String },

    /// A contract feature could be neither derived nor imputed.
    #[error("feature contract mismatch for {feature}: {message}")]
    ContractMismatch { feature: String, message: String },

    /// Missing, corrupt or inconsistent trained artifact.
    #[error("failed to load artifact {path}: {message}")]
    ModelLoad { path: String, message: String },

    /// Configuration could not be read or deserialized.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn contract_mismatch(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContractMismatch {
            feature: feature.into(),
            message: message.into(),
        }
    }

    pub fn model_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::ContractMismatch { .. } => "contract_mismatch",
            Self::ModelLoad { .. } => "model_load",
            Self::Config(_) => "config",
        }
    }

    /// Offending field or feature name, if the error is tied to one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::ContractMismatch { feature, .. } => Some(feature),
            Self::ModelLoad { .. } | Self::Config(_) => None,
        }
    }

    /// Whether the caller sent a bad request (as opposed to a serving-side fault).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Reasons an attribution could not be produced for a prediction.
///
/// These never fail a request; the result carries a degraded explanation instead.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExplanationError {
    #[error("tree {tree} node {node} has no usable cover statistic")]
    InvalidCover { tree: usize, node: usize },

    #[error("tree {tree} splits on feature index {feature} outside the {width}-feature input")]
    FeatureOutOfRange {
        tree: usize,
        feature: usize,
        width: usize,
    },

    #[error("attribution for {feature} is not finite")]
    NonFinite { feature: String },

    #[error("attributions sum to {sum:.6} but model margin is {margin:.6}")]
    ConservationViolated { sum: f64, margin: f64 },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
