//! Response envelope published for every service request

use crate::error::PipelineError;
use crate::types::prediction::PredictionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Machine-readable failure description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error kind, e.g. `validation`
    pub kind: String,

    /// Offending input field or feature name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    pub message: String,
}

impl From<&PipelineError> for ErrorBody {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind().to_string(),
            field: err.field().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// Envelope wrapping a prediction or an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Unique response identifier
    pub request_id: String,

    pub status: ResponseStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PredictionResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,

    /// Response generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl ResponseEnvelope {
    /// Successful response carrying a prediction
    pub fn ok(result: PredictionResult) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            status: ResponseStatus::Ok,
            data: Some(result),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Failed response
    pub fn error(err: &PipelineError) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            status: ResponseStatus::Error,
            data: None,
            error: Some(err.into()),
            timestamp: Utc::now(),
        }
    }
}
