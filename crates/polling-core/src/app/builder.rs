//! ReconcilerBuilder - coordinator の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - port が一つでも欠けていれば build() は BuildError::Missing を返す
//! - config は build() 時に validate() される
//! - clock だけは SystemClock が既定値

use std::sync::Arc;

use super::config::{ConfigError, ReconcilerConfig};
use super::coordinator::ReconciliationCoordinator;
use super::locks::SubscriptionLocks;
use crate::ports::{
    Clock, EventPublisher, JobLifecycle, PollingStatusSink, SubscriptionStore, SystemClock,
    WebhookRedelivery,
};

/// # 使用例
/// ```ignore
/// let coordinator = ReconcilerBuilder::new()
///     .store(store)
///     .publisher(bus)
///     .redelivery(webhooks)
///     .lifecycle(jobs)
///     .status_sink(status)
///     .build()?;
/// ```
#[derive(Default)]
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn SubscriptionStore>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    redelivery: Option<Arc<dyn WebhookRedelivery>>,
    lifecycle: Option<Arc<dyn JobLifecycle>>,
    status: Option<Arc<dyn PollingStatusSink>>,
    clock: Option<Arc<dyn Clock>>,
    config: ReconcilerConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing port: {0}. It must be supplied before build().")]
    Missing(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ReconcilerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn SubscriptionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn redelivery(mut self, redelivery: Arc<dyn WebhookRedelivery>) -> Self {
        self.redelivery = Some(redelivery);
        self
    }

    pub fn lifecycle(mut self, lifecycle: Arc<dyn JobLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn status_sink(mut self, status: Arc<dyn PollingStatusSink>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ReconciliationCoordinator, BuildError> {
        self.config.validate()?;

        Ok(ReconciliationCoordinator {
            store: self.store.ok_or(BuildError::Missing("subscription store"))?,
            publisher: self.publisher.ok_or(BuildError::Missing("event publisher"))?,
            redelivery: self.redelivery.ok_or(BuildError::Missing("webhook redelivery"))?,
            lifecycle: self.lifecycle.ok_or(BuildError::Missing("job lifecycle"))?,
            status: self.status.ok_or(BuildError::Missing("polling status sink"))?,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            locks: SubscriptionLocks::new(),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailurePolicy;
    use crate::impls::{
        InMemoryEventBus, InMemoryJobLifecycle, InMemoryPollingStatus, InMemorySubscriptionStore,
        InMemoryWebhookRedelivery,
    };
    use crate::ports::UlidGenerator;

    fn complete() -> ReconcilerBuilder {
        ReconcilerBuilder::new()
            .store(Arc::new(InMemorySubscriptionStore::new()))
            .publisher(Arc::new(InMemoryEventBus::new(UlidGenerator::new(SystemClock))))
            .redelivery(Arc::new(InMemoryWebhookRedelivery::new()))
            .lifecycle(Arc::new(InMemoryJobLifecycle::new()))
            .status_sink(Arc::new(InMemoryPollingStatus::new()))
    }

    #[test]
    fn test_build_success() {
        let coordinator = complete().build().unwrap();
        assert_eq!(coordinator.config(), &ReconcilerConfig::default());
    }

    #[test]
    fn test_build_missing_port() {
        let result = ReconcilerBuilder::new()
            .store(Arc::new(InMemorySubscriptionStore::new()))
            .build();
        assert!(matches!(result, Err(BuildError::Missing("event publisher"))));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = ReconcilerConfig {
            failure_policy: FailurePolicy::new(0, 3500),
            ..ReconcilerConfig::default()
        };
        let result = complete().config(config).build();
        assert!(matches!(result, Err(BuildError::Config(ConfigError::Invalid(_)))));
    }
}
