//! Errors - エラー型と分類
//!
//! `ReconcileError` だけが `handle_report` の呼び出し元に返る。
//! 孤児 report・署名なし subscription・worker 側の失敗はエラーではない。

use std::time::Duration;

use thiserror::Error;

use super::ids::{AccountId, JobId, SubscriptionId};
use super::source::SourceType;
use super::subscription::SubscriptionKind;

/// Operational classification of a reconcile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Subscription data does not match any known shape. Needs a code or data fix.
    Configuration,
    /// Store / bus / job service trouble. The next report retries naturally.
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("subscription {account_id}/{subscription_id} not found")]
    NotFound {
        account_id: AccountId,
        subscription_id: SubscriptionId,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("bus rejected message: {0}")]
    Rejected(String),

    #[error("bus unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("job service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status sink unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("unrecognized source descriptor for subscription {subscription_id}")]
    UnrecognizedSource { subscription_id: SubscriptionId },

    #[error("source {source_type:?} cannot serve a {kind:?} subscription ({subscription_id})")]
    SourceKindMismatch {
        subscription_id: SubscriptionId,
        kind: SubscriptionKind,
        source_type: SourceType,
    },

    #[error("{reported:?} payload reported for {expected:?} subscription {subscription_id}")]
    PayloadKindMismatch {
        subscription_id: SubscriptionId,
        expected: SubscriptionKind,
        reported: SubscriptionKind,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("publish failed: {0}")]
    Publish(#[source] PublishError),

    #[error("webhook redelivery failed: {0}")]
    Redelivery(#[source] PublishError),

    #[error("lifecycle request for job {job_id} failed: {source}")]
    Lifecycle {
        job_id: JobId,
        #[source]
        source: LifecycleError,
    },

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("subscription {subscription_id} is busy; lock not acquired within {waited:?}")]
    LockTimeout {
        subscription_id: SubscriptionId,
        waited: Duration,
    },
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::UnrecognizedSource { .. }
            | ReconcileError::SourceKindMismatch { .. }
            | ReconcileError::PayloadKindMismatch { .. } => ErrorKind::Configuration,
            _ => ErrorKind::Infrastructure,
        }
    }
}
