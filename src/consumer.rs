//! NATS intake for order records

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes the service to prediction requests.
///
/// With a queue group, instances sharing the group split the request stream
/// instead of each receiving every order.
pub struct OrderConsumer {
    client: Client,
    subject: String,
    queue_group: Option<String>,
}

impl OrderConsumer {
    pub fn new(client: Client, subject: &str, queue_group: Option<&str>) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            queue_group: queue_group_name(queue_group),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match &self.queue_group {
            Some(group) => {
                self.client
                    .queue_subscribe(self.subject.clone(), group.clone())
                    .await?
            }
            None => self.client.subscribe(self.subject.clone()).await?,
        };
        info!(
            subject = %self.subject,
            queue_group = ?self.queue_group,
            "Subscribed to request subject"
        );
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Blank group names mean a plain subscription.
fn queue_group_name(group: Option<&str>) -> Option<String> {
    group
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_group_name() {
        assert_eq!(queue_group_name(Some("review-risk")), Some("review-risk".to_string()));
        assert_eq!(queue_group_name(Some("  ")), None);
        assert_eq!(queue_group_name(None), None);
    }
}
