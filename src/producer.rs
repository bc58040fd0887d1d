//! NATS message producer for prediction responses

use crate::types::envelope::{ResponseEnvelope, ResponseStatus};
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Producer for publishing response envelopes to NATS
#[derive(Clone)]
pub struct ResultProducer {
    client: Client,
    subject: String,
}

impl ResultProducer {
    /// Create a new result producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a response, to the request's reply subject when it has one
    pub async fn publish(&self, envelope: &ResponseEnvelope, reply: Option<&str>) -> Result<()> {
        let payload = serde_json::to_vec(envelope)?;
        let destination = destination(reply, &self.subject);

        self.client
            .publish(destination.to_string(), payload.into())
            .await?;

        debug!(
            request_id = %envelope.request_id,
            subject = %destination,
            ok = envelope.status == ResponseStatus::Ok,
            "Published response"
        );

        Ok(())
    }

    /// Get the default result subject
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Subject a response is sent to: the reply inbox, else the result subject.
fn destination<'a>(reply: Option<&'a str>, default: &'a str) -> &'a str {
    match reply {
        Some(reply) if !reply.is_empty() => reply,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_prefers_reply_subject() {
        assert_eq!(destination(Some("_INBOX.abc"), "reviews.predictions"), "_INBOX.abc");
        assert_eq!(destination(None, "reviews.predictions"), "reviews.predictions");
        assert_eq!(destination(Some(""), "reviews.predictions"), "reviews.predictions");
    }
}
