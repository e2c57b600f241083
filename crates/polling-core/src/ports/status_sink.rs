//! PollingStatusSink port - trigger 側に見せるポーリング結果

use async_trait::async_trait;

use crate::domain::{AccountId, PollingStatus, StatusError};

#[async_trait]
pub trait PollingStatusSink: Send + Sync {
    async fn record(
        &self,
        account_id: &AccountId,
        routing_signatures: &[String],
        status: PollingStatus,
    ) -> Result<(), StatusError>;
}
