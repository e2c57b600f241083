//! InMemorySubscriptionStore - 開発用・テスト用の正本
//!
//! # 実装詳細
//! - HashMap<(AccountId, SubscriptionId), Subscription> を tokio の Mutex で保護
//! - ロックを await を跨いで保持しない（fault の stall はロックの外で行う）
//! - 書き込みは `writes()` で観測できる（テストでの検証用）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::fault::Fault;
use crate::domain::{AccountId, PolledState, StoreError, Subscription, SubscriptionId};
use crate::ports::SubscriptionStore;

type StoreKey = (AccountId, SubscriptionId);

/// One mutation applied to the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Deleted(SubscriptionId),
    FailedAttempts(SubscriptionId, u32),
    PolledState(SubscriptionId, PolledState),
}

#[derive(Default)]
struct InMemoryStoreState {
    subscriptions: HashMap<StoreKey, Subscription>,
    writes: Vec<StoreWrite>,
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    state: Arc<Mutex<InMemoryStoreState>>,
    read_fault: Fault,
    counter_fault: Fault,
    baseline_fault: Fault,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, subscription: Subscription) {
        let key = (
            subscription.account_id.clone(),
            subscription.subscription_id.clone(),
        );
        self.state.lock().await.subscriptions.insert(key, subscription);
    }

    pub async fn snapshot(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
    ) -> Option<Subscription> {
        let key = (account_id.clone(), subscription_id.clone());
        self.state.lock().await.subscriptions.get(&key).cloned()
    }

    pub async fn all(&self) -> Vec<Subscription> {
        let state = self.state.lock().await;
        let mut all: Vec<_> = state.subscriptions.values().cloned().collect();
        all.sort_by(|a, b| a.subscription_id.cmp(&b.subscription_id));
        all
    }

    pub async fn writes(&self) -> Vec<StoreWrite> {
        self.state.lock().await.writes.clone()
    }

    /// Fault applied to `get`.
    pub fn read_fault(&self) -> &Fault {
        &self.read_fault
    }

    /// Fault applied to `update_failed_attempts`.
    pub fn counter_fault(&self) -> &Fault {
        &self.counter_fault
    }

    /// Fault applied to `update_polled_state`.
    pub fn baseline_fault(&self) -> &Fault {
        &self.baseline_fault
    }

    async fn mutate(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
        write: StoreWrite,
        apply: impl FnOnce(&mut Subscription),
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let key = (account_id.clone(), subscription_id.clone());
        let Some(subscription) = state.subscriptions.get_mut(&key) else {
            return Err(StoreError::NotFound {
                account_id: account_id.clone(),
                subscription_id: subscription_id.clone(),
            });
        };
        apply(subscription);
        state.writes.push(write);
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError> {
        self.read_fault.trip("get").await.map_err(StoreError::Unavailable)?;
        Ok(self.snapshot(account_id, subscription_id).await)
    }

    async fn delete(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let key = (account_id.clone(), subscription_id.clone());
        if state.subscriptions.remove(&key).is_some() {
            state.writes.push(StoreWrite::Deleted(subscription_id.clone()));
        }
        Ok(())
    }

    async fn update_failed_attempts(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
        failed_attempts: u32,
    ) -> Result<(), StoreError> {
        self.counter_fault
            .trip("update_failed_attempts")
            .await
            .map_err(StoreError::Unavailable)?;
        self.mutate(
            account_id,
            subscription_id,
            StoreWrite::FailedAttempts(subscription_id.clone(), failed_attempts),
            |s| s.failed_attempts = failed_attempts,
        )
        .await
    }

    async fn update_polled_state(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
        polled_state: PolledState,
    ) -> Result<(), StoreError> {
        self.baseline_fault
            .trip("update_polled_state")
            .await
            .map_err(StoreError::Unavailable)?;
        self.mutate(
            account_id,
            subscription_id,
            StoreWrite::PolledState(subscription_id.clone(), polled_state.clone()),
            |s| s.polled_state = Some(polled_state),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SourceDescriptor, SubscriptionKind};

    fn subscription() -> Subscription {
        Subscription::new(
            "acct".into(),
            "doc".into(),
            SubscriptionKind::Artifact,
            "pt".into(),
            SourceDescriptor::DockerHub {
                image_path: "imagePath".into(),
            },
        )
        .with_signature("sig1")
    }

    #[tokio::test]
    async fn partial_updates_leave_other_fields_alone() {
        let store = InMemorySubscriptionStore::new();
        store.insert(subscription().with_failed_attempts(3)).await;

        let account = AccountId::new("acct");
        let id = SubscriptionId::new("doc");
        store
            .update_polled_state(&account, &id, PolledState::new(["1.0"]))
            .await
            .unwrap();

        let saved = store.get(&account, &id).await.unwrap().unwrap();
        assert_eq!(saved.failed_attempts, 3);
        assert_eq!(saved.polled_state, Some(PolledState::new(["1.0"])));
        assert_eq!(saved.routing_signatures, vec!["sig1"]);
    }

    #[tokio::test]
    async fn updating_missing_subscription_is_not_found() {
        let store = InMemorySubscriptionStore::new();
        let err = store
            .update_failed_attempts(&"acct".into(), &"nope".into(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemorySubscriptionStore::new();
        store.insert(subscription()).await;

        let account = AccountId::new("acct");
        let id = SubscriptionId::new("doc");
        store.delete(&account, &id).await.unwrap();
        store.delete(&account, &id).await.unwrap();

        assert!(store.snapshot(&account, &id).await.is_none());
        assert_eq!(store.writes().await, vec![StoreWrite::Deleted(id)]);
    }

    #[tokio::test]
    async fn baseline_fault_rejects_write_without_touching_state() {
        let store = InMemorySubscriptionStore::new();
        store
            .insert(subscription().with_polled_state(PolledState::new(["a"])))
            .await;
        store.baseline_fault().set_failing(true);

        let account = AccountId::new("acct");
        let id = SubscriptionId::new("doc");
        let err = store
            .update_polled_state(&account, &id, PolledState::new(["a", "b"]))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        let saved = store.snapshot(&account, &id).await.unwrap();
        assert_eq!(saved.polled_state, Some(PolledState::new(["a"])));
    }
}
