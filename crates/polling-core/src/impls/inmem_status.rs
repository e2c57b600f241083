//! InMemoryPollingStatus - trigger 側の状態表示の代役
//!
//! signature ごとに最新の `PollingStatus` だけを保持する。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::fault::Fault;
use crate::domain::{AccountId, PollingStatus, StatusError};
use crate::ports::PollingStatusSink;

#[derive(Default)]
pub struct InMemoryPollingStatus {
    latest: Mutex<HashMap<(AccountId, String), PollingStatus>>,
    fault: Fault,
}

impl InMemoryPollingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self, account_id: &AccountId, signature: &str) -> Option<PollingStatus> {
        self.latest
            .lock()
            .ok()
            .and_then(|m| m.get(&(account_id.clone(), signature.to_string())).cloned())
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }
}

#[async_trait]
impl PollingStatusSink for InMemoryPollingStatus {
    async fn record(
        &self,
        account_id: &AccountId,
        routing_signatures: &[String],
        status: PollingStatus,
    ) -> Result<(), StatusError> {
        self.fault.trip("record").await.map_err(StatusError::Unavailable)?;

        let mut latest = self
            .latest
            .lock()
            .map_err(|e| StatusError::Unavailable(format!("status map poisoned: {e}")))?;
        for signature in routing_signatures {
            latest.insert((account_id.clone(), signature.clone()), status.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn latest_status_wins_per_signature() {
        let sink = InMemoryPollingStatus::new();
        let account = AccountId::new("acct");
        let sigs = vec!["sig1".to_string(), "sig2".to_string()];

        sink.record(&account, &sigs, PollingStatus::failed(Some("boom".into()), Utc::now()))
            .await
            .unwrap();
        sink.record(&account, &sigs[..1], PollingStatus::succeeded(vec!["1.0".into()], Utc::now()))
            .await
            .unwrap();

        assert!(sink.latest(&account, "sig1").unwrap().success);
        assert!(!sink.latest(&account, "sig2").unwrap().success);
        assert!(sink.latest(&account, "sig3").is_none());
    }
}
