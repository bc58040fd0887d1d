//! Review Risk Pipeline Library
//!
//! Predicts whether an e-commerce order will receive a negative (1-2 star)
//! review and explains each prediction with per-feature TreeSHAP contributions.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::OrderConsumer;
pub use error::{ExplanationError, PipelineError};
pub use feature_extractor::FeatureExtractor;
pub use pipeline::ReviewRiskPipeline;
pub use producer::ResultProducer;
pub use types::{OrderRecord, PredictionResult, ResponseEnvelope};
