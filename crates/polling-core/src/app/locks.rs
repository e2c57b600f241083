//! SubscriptionLocks - subscription 単位の直列化
//!
//! 同じ subscription への report は一つずつ、別の subscription は並行に処理する。
//! 引き継ぎ中の古い worker と新しい worker が同時に report しても
//! failed_attempts や baseline の更新が失われないようにする。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::{AccountId, SubscriptionId};

type LockKey = (AccountId, SubscriptionId);
type LockTable = Arc<Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>>;

/// Held for the duration of one report.
pub struct SubscriptionGuard {
    // field order matters: the mutex guard must go before the entry is released
    _guard: OwnedMutexGuard<()>,
    _release: Release,
}

/// Removes the table entry once nobody holds or waits on it.
///
/// Created before the entry is looked up so that a timed-out or cancelled
/// wait cleans up after itself too.
struct Release {
    table: LockTable,
    key: LockKey,
}

impl Drop for Release {
    fn drop(&mut self) {
        if let Ok(mut locks) = self.table.lock() {
            let idle = locks
                .get(&self.key)
                .is_some_and(|lock| Arc::strong_count(lock) == 1);
            if idle {
                locks.remove(&self.key);
            }
        }
    }
}

#[derive(Default)]
pub struct SubscriptionLocks {
    locks: LockTable,
}

impl SubscriptionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `wait` for the subscription's lock. `None` on timeout.
    pub async fn acquire(
        &self,
        account_id: &AccountId,
        subscription_id: &SubscriptionId,
        wait: Duration,
    ) -> Option<SubscriptionGuard> {
        let release = Release {
            table: Arc::clone(&self.locks),
            key: (account_id.clone(), subscription_id.clone()),
        };
        let lock = self.entry(&release.key)?;
        let guard = tokio::time::timeout(wait, lock.lock_owned()).await.ok()?;
        Some(SubscriptionGuard {
            _guard: guard,
            _release: release,
        })
    }

    /// Number of subscriptions currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &LockKey) -> Option<Arc<AsyncMutex<()>>> {
        let mut locks = self.locks.lock().ok()?;
        let lock = locks.entry(key.clone()).or_default();
        Some(Arc::clone(lock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_subscription_waits() {
        let locks = SubscriptionLocks::new();
        let account = AccountId::new("acct");
        let doc = SubscriptionId::new("doc");

        let held = locks
            .acquire(&account, &doc, Duration::from_millis(50))
            .await
            .unwrap();
        let second = locks.acquire(&account, &doc, Duration::from_millis(50)).await;
        assert!(second.is_none());

        drop(held);
        let third = locks.acquire(&account, &doc, Duration::from_millis(50)).await;
        assert!(third.is_some());
    }

    #[tokio::test]
    async fn different_subscriptions_do_not_contend() {
        let locks = SubscriptionLocks::new();
        let account = AccountId::new("acct");

        let _a = locks
            .acquire(&account, &"doc-a".into(), Duration::from_millis(50))
            .await
            .unwrap();
        let b = locks
            .acquire(&account, &"doc-b".into(), Duration::from_millis(50))
            .await;
        assert!(b.is_some());
    }

    #[tokio::test]
    async fn entry_lives_while_held_or_awaited() {
        let locks = Arc::new(SubscriptionLocks::new());
        let account = AccountId::new("acct");
        let doc = SubscriptionId::new("doc");

        let held = locks
            .acquire(&account, &doc, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(locks.len(), 1);

        let waiter = {
            let locks = locks.clone();
            let account = account.clone();
            let doc = doc.clone();
            tokio::spawn(async move {
                locks
                    .acquire(&account, &doc, Duration::from_secs(5))
                    .await
                    .is_some()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // the waiter keeps the entry even though the holder is gone
        drop(held);
        assert!(waiter.await.unwrap());
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn timed_out_wait_leaves_no_entry_behind() {
        let locks = SubscriptionLocks::new();
        let account = AccountId::new("acct");
        let doc = SubscriptionId::new("doc");

        let held = locks
            .acquire(&account, &doc, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(locks.acquire(&account, &doc, Duration::from_millis(10)).await.is_none());
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn released_locks_do_not_accumulate() {
        let locks = SubscriptionLocks::new();
        let account = AccountId::new("acct");

        for i in 0..100 {
            let doc = SubscriptionId::new(format!("doc-{i}"));
            let guard = locks.acquire(&account, &doc, Duration::from_millis(50)).await;
            assert!(guard.is_some());
        }

        assert!(locks.is_empty());
    }
}
