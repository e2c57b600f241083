//! JobLifecycle port - backing job（perpetual task）の操作
//!
//! 作成は provisioning 側の責務。ここでは reset と delete だけを扱う。

use async_trait::async_trait;

use crate::domain::{AccountId, JobId, LifecycleError, SubscriptionId};

#[async_trait]
pub trait JobLifecycle: Send + Sync {
    /// Re-issue the subscription's backing job with the same parameters.
    async fn reset_job(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
        job_id: &JobId,
    ) -> Result<(), LifecycleError>;

    /// Permanently remove a job. Idempotent: deleting a missing job is `Ok`.
    async fn delete_job(&self, job_id: &JobId, account_id: &AccountId)
    -> Result<(), LifecycleError>;
}
