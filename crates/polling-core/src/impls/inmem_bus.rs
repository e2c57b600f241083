//! In-memory outbound adapters: event bus and webhook redelivery.
//!
//! Both keep everything they were handed so the CLI can print it and tests
//! can assert on it.

use std::sync::Mutex;

use async_trait::async_trait;

use super::fault::Fault;
use crate::domain::{
    ChangeEvent, MessageId, PublishError, Subscription, SubscriptionId, WebhookDelivery,
};
use crate::ports::{EventPublisher, IdGenerator, WebhookRedelivery};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub message_id: MessageId,
    pub event: ChangeEvent,
}

pub struct InMemoryEventBus<G> {
    id_gen: G,
    messages: Mutex<Vec<PublishedMessage>>,
    fault: Fault,
}

impl<G: IdGenerator> InMemoryEventBus<G> {
    pub fn new(id_gen: G) -> Self {
        Self {
            id_gen,
            messages: Mutex::new(Vec::new()),
            fault: Fault::default(),
        }
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }
}

#[async_trait]
impl<G: IdGenerator> EventPublisher for InMemoryEventBus<G> {
    async fn publish(&self, event: ChangeEvent) -> Result<MessageId, PublishError> {
        self.fault.trip("publish").await.map_err(PublishError::Unavailable)?;

        let message_id = self.id_gen.generate_message_id();
        let mut messages = self
            .messages
            .lock()
            .map_err(|e| PublishError::Unavailable(format!("bus poisoned: {e}")))?;
        messages.push(PublishedMessage { message_id, event });
        Ok(message_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redelivered {
    pub subscription_id: SubscriptionId,
    pub routing_signatures: Vec<String>,
    pub deliveries: Vec<WebhookDelivery>,
}

#[derive(Default)]
pub struct InMemoryWebhookRedelivery {
    batches: Mutex<Vec<Redelivered>>,
    fault: Fault,
}

impl InMemoryWebhookRedelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<Redelivered> {
        self.batches
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }
}

#[async_trait]
impl WebhookRedelivery for InMemoryWebhookRedelivery {
    async fn redeliver(
        &self,
        subscription: &Subscription,
        deliveries: Vec<WebhookDelivery>,
    ) -> Result<(), PublishError> {
        self.fault.trip("redeliver").await.map_err(PublishError::Unavailable)?;

        let mut batches = self
            .batches
            .lock()
            .map_err(|e| PublishError::Unavailable(format!("redelivery poisoned: {e}")))?;
        batches.push(Redelivered {
            subscription_id: subscription.subscription_id.clone(),
            routing_signatures: subscription.routing_signatures.clone(),
            deliveries,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceType;
    use crate::ports::{SystemClock, UlidGenerator};

    fn event(keys: &[&str]) -> ChangeEvent {
        ChangeEvent {
            account_id: "acct".into(),
            routing_signatures: vec!["sig1".into()],
            source_type: SourceType::Gcr,
            source_name: "imagePath".into(),
            new_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn publish_keeps_all_keys_in_one_message() {
        let bus = InMemoryEventBus::new(UlidGenerator::new(SystemClock));
        let id = bus.publish(event(&["1", "2", "3"])).await.unwrap();

        let messages = bus.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_id, id);
        assert_eq!(messages[0].event.new_keys.len(), 3);
    }

    #[tokio::test]
    async fn failing_bus_records_nothing() {
        let bus = InMemoryEventBus::new(UlidGenerator::new(SystemClock));
        bus.fault().set_failing(true);

        let err = bus.publish(event(&["1"])).await.unwrap_err();
        assert!(matches!(err, PublishError::Unavailable(_)));
        assert!(bus.messages().is_empty());
    }
}
