//! SubscriptionStore port - subscription と baseline の正本
//!
//! # 設計原則
//! - 同一 subscription の read-modify-write は呼び出し側（coordinator）が
//!   `SubscriptionLocks` で直列化する。store は単発の読み書きだけを提供する
//! - 更新は部分更新（failed_attempts だけ、polled_state だけ）で、
//!   他のフィールドを上書きしない

use async_trait::async_trait;

use crate::domain::{AccountId, PolledState, StoreError, Subscription, SubscriptionId};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Remove the subscription. Absent is not an error.
    async fn delete(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
    ) -> Result<(), StoreError>;

    async fn update_failed_attempts(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
        failed_attempts: u32,
    ) -> Result<(), StoreError>;

    /// Replace the baseline wholesale.
    async fn update_polled_state(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
        state: PolledState,
    ) -> Result<(), StoreError>;
}
