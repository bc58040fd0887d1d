//! Feature contract, imputation and feature vector types

pub mod contract;
pub mod imputer;
pub mod text;
pub mod vector;

pub use contract::{FeatureContract, FEATURE_COUNT};
pub use imputer::MedianImputer;
pub use text::TextStats;
pub use vector::FeatureVector;
