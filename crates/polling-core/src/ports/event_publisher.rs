//! Outbound ports: the event bus and the webhook redelivery collaborator.
//!
//! Both are fire-once from the coordinator's side. Delivery guarantees past
//! the call are the bus's concern.

use async_trait::async_trait;

use crate::domain::{ChangeEvent, MessageId, PublishError, Subscription, WebhookDelivery};

/// Puts one change event on the bus as a single message.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: ChangeEvent) -> Result<MessageId, PublishError>;
}

/// Forwards captured webhook deliveries (payload + headers) for replay.
#[async_trait]
pub trait WebhookRedelivery: Send + Sync {
    async fn redeliver(
        &self,
        subscription: &Subscription,
        deliveries: Vec<WebhookDelivery>,
    ) -> Result<(), PublishError>;
}
