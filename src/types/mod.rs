//! Type definitions for the review-risk pipeline

pub mod envelope;
pub mod order;
pub mod prediction;

pub use envelope::{ErrorBody, ResponseEnvelope, ResponseStatus};
pub use order::{OrderRecord, ValidatedOrder};
pub use prediction::{ExplanationStatus, ImpactLevel, PredictionResult, Reason, Sentiment};
