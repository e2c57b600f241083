//! InMemoryJobLifecycle - perpetual task サービスの代役
//!
//! reset / delete の要求を記録するだけ。delete は冪等。

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use super::fault::Fault;
use crate::domain::{AccountId, JobId, LifecycleError, SubscriptionId};
use crate::ports::JobLifecycle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    Reset {
        subscription_id: SubscriptionId,
        job_id: JobId,
    },
    Delete {
        job_id: JobId,
        account_id: AccountId,
    },
}

#[derive(Default)]
struct JobsState {
    live: HashSet<JobId>,
    requests: Vec<JobRequest>,
}

#[derive(Default)]
pub struct InMemoryJobLifecycle {
    state: Mutex<JobsState>,
    fault: Fault,
}

impl InMemoryJobLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs<I: IntoIterator<Item = JobId>>(jobs: I) -> Self {
        let lifecycle = Self::default();
        if let Ok(mut state) = lifecycle.state.lock() {
            state.live.extend(jobs);
        }
        lifecycle
    }

    pub fn requests(&self) -> Vec<JobRequest> {
        self.state
            .lock()
            .map(|s| s.requests.clone())
            .unwrap_or_default()
    }

    pub fn resets(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, JobRequest::Reset { .. }))
            .count()
    }

    pub fn deletes(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, JobRequest::Delete { .. }))
            .count()
    }

    pub fn is_live(&self, job_id: &JobId) -> bool {
        self.state
            .lock()
            .map(|s| s.live.contains(job_id))
            .unwrap_or(false)
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, JobsState>, LifecycleError> {
        self.state
            .lock()
            .map_err(|e| LifecycleError::Unavailable(format!("job registry poisoned: {e}")))
    }
}

#[async_trait]
impl JobLifecycle for InMemoryJobLifecycle {
    async fn reset_job(
        &self,
        _account_id: &AccountId,
        subscription_id: &SubscriptionId,
        job_id: &JobId,
    ) -> Result<(), LifecycleError> {
        self.fault.trip("reset_job").await.map_err(LifecycleError::Unavailable)?;

        let mut state = self.lock()?;
        state.live.insert(job_id.clone());
        state.requests.push(JobRequest::Reset {
            subscription_id: subscription_id.clone(),
            job_id: job_id.clone(),
        });
        Ok(())
    }

    async fn delete_job(
        &self,
        job_id: &JobId,
        account_id: &AccountId,
    ) -> Result<(), LifecycleError> {
        self.fault.trip("delete_job").await.map_err(LifecycleError::Unavailable)?;

        let mut state = self.lock()?;
        state.live.remove(job_id);
        state.requests.push(JobRequest::Delete {
            job_id: job_id.clone(),
            account_id: account_id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_of_missing_job_is_ok() {
        let jobs = InMemoryJobLifecycle::with_jobs([JobId::new("pt")]);

        jobs.delete_job(&"pt".into(), &"acct".into()).await.unwrap();
        jobs.delete_job(&"pt".into(), &"acct".into()).await.unwrap();

        assert!(!jobs.is_live(&"pt".into()));
        assert_eq!(jobs.deletes(), 2);
    }

    #[tokio::test]
    async fn reset_keeps_job_live() {
        let jobs = InMemoryJobLifecycle::with_jobs([JobId::new("pt")]);
        jobs.reset_job(&"acct".into(), &"doc".into(), &"pt".into())
            .await
            .unwrap();

        assert!(jobs.is_live(&"pt".into()));
        assert_eq!(jobs.resets(), 1);
    }
}
