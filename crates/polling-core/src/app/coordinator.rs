//! ReconciliationCoordinator - report 一件を最後まで処理する
//!
//! # フロー
//! 1. subscription 単位のロックを取る
//! 2. subscription を読む。無い / job が違う → 報告してきた job を削除（孤児）
//! 3. 署名が無い → subscription を削除
//! 4. 失敗 report → failed_attempts を進めて reset / give-up を判断
//! 5. 成功 report → diff → publish → baseline 保存 → counter を 0 に戻す
//!
//! publish してから保存する。保存に失敗すると次の report で同じ key が
//! もう一度 publish されうる（at-least-once）。逆順にはしない。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::config::ReconcilerConfig;
use super::locks::SubscriptionLocks;
use crate::domain::{
    AccountId, ChangeEvent, Detection, FailureAction, JobId, MessageId, PollingStatus,
    ReconcileError, Report, ReportOutcome, ReportPayload, ResolvedSource, Subscription,
    detect_observation,
};
use crate::ports::{
    Clock, EventPublisher, JobLifecycle, PollingStatusSink, SubscriptionStore, WebhookRedelivery,
};

/// What `handle_report` did with a report that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDisposition {
    /// No live subscription is backed by the reporting job; the job was deleted.
    Orphaned,

    /// Subscription had no routing signatures and was deleted.
    DegenerateDeleted,

    /// Worker-reported failure was counted.
    FailureRecorded {
        failed_attempts: u32,
        action: FailureAction,
    },

    /// Diff applied and baseline persisted.
    Reconciled {
        new_keys: Vec<String>,
        pruned_keys: Vec<String>,
        message_id: Option<MessageId>,
        first_contact: bool,
    },
}

pub struct ReconciliationCoordinator {
    pub(crate) store: Arc<dyn SubscriptionStore>,
    pub(crate) publisher: Arc<dyn EventPublisher>,
    pub(crate) redelivery: Arc<dyn WebhookRedelivery>,
    pub(crate) lifecycle: Arc<dyn JobLifecycle>,
    pub(crate) status: Arc<dyn PollingStatusSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) locks: SubscriptionLocks,
    pub(crate) config: ReconcilerConfig,
}

impl ReconciliationCoordinator {
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Process one report from the job `reporting_job` end to end.
    ///
    /// Returns `Err` only for configuration-shape mismatches and store / bus
    /// failures. When it does, the subscription's baseline is unchanged.
    #[tracing::instrument(
        skip_all,
        fields(
            account_id = %account_id,
            subscription_id = %report.subscription_id,
            job_id = %reporting_job,
        )
    )]
    pub async fn handle_report(
        &self,
        reporting_job: &JobId,
        account_id: &AccountId,
        report: Report,
    ) -> Result<ReportDisposition, ReconcileError> {
        let subscription_id = report.subscription_id.clone();
        let lock_wait = self.config.lock_wait();
        let _guard = self
            .locks
            .acquire(account_id, &subscription_id, lock_wait)
            .await
            .ok_or_else(|| ReconcileError::LockTimeout {
                subscription_id: subscription_id.clone(),
                waited: lock_wait,
            })?;

        let subscription = self
            .with_store("get", async {
                Ok(self.store.get(account_id, &subscription_id).await?)
            })
            .await?;

        let backed = subscription.filter(|s| s.is_backed_by(reporting_job));
        let Some(mut subscription) = backed else {
            warn!("report from a job that backs no live subscription; deleting the job");
            self.delete_job(reporting_job, account_id).await?;
            return Ok(ReportDisposition::Orphaned);
        };

        if subscription.is_degenerate() {
            warn!("subscription has no routing signatures; deleting it");
            self.with_store("delete", async {
                Ok(self.store.delete(account_id, &subscription_id).await?)
            })
            .await?;
            return Ok(ReportDisposition::DegenerateDeleted);
        }

        match report.outcome {
            ReportOutcome::Failure { error_message } => {
                self.record_failure(&subscription, error_message).await
            }
            ReportOutcome::Success { payload } => {
                // Forgiven in memory now, persisted together with the baseline.
                let forgiven = subscription.failed_attempts;
                subscription.failed_attempts = 0;
                self.reconcile(&subscription, payload, forgiven).await
            }
        }
    }

    /// `forgiven` is the failure count this success clears. It reaches the
    /// store only after the new baseline has.
    async fn reconcile(
        &self,
        subscription: &Subscription,
        payload: ReportPayload,
        forgiven: u32,
    ) -> Result<ReportDisposition, ReconcileError> {
        if payload.kind() != subscription.kind {
            error!(
                expected = ?subscription.kind,
                reported = ?payload.kind(),
                "report payload does not match subscription kind"
            );
            return Err(ReconcileError::PayloadKindMismatch {
                subscription_id: subscription.subscription_id.clone(),
                expected: subscription.kind,
                reported: payload.kind(),
            });
        }

        let source = self.resolve_source(subscription)?;
        let first_contact = subscription.polled_state.is_none();
        let Detection {
            new_keys,
            pruned_keys,
            next_state,
        } = detect_observation(subscription.polled_state.as_ref(), &payload.observation());

        debug!(
            new_keys = new_keys.len(),
            pruned_keys = pruned_keys.len(),
            baseline = next_state.len(),
            first_contact,
            "diff computed"
        );

        let mut message_id = None;
        if !new_keys.is_empty() {
            let sent = match &payload {
                ReportPayload::WebhookDelivery(p) => {
                    let deliveries = p.deliveries_for(&new_keys);
                    self.within("redeliver", self.config.bus_timeout(), async {
                        self.redelivery
                            .redeliver(subscription, deliveries)
                            .await
                            .map_err(ReconcileError::Redelivery)
                    })
                    .await
                    .map(|()| None)
                }
                ReportPayload::Artifact(_) | ReportPayload::Manifest(_) => {
                    let event = ChangeEvent {
                        account_id: subscription.account_id.clone(),
                        routing_signatures: subscription.routing_signatures.clone(),
                        source_type: source.source_type,
                        source_name: source.name.clone(),
                        new_keys: new_keys.clone(),
                    };
                    self.within("publish", self.config.bus_timeout(), async {
                        self.publisher
                            .publish(event)
                            .await
                            .map_err(ReconcileError::Publish)
                    })
                    .await
                    .map(Some)
                }
            };

            match sent {
                Ok(id) => {
                    info!(new_keys = new_keys.len(), message_id = ?id, "published new items");
                    message_id = id;
                }
                Err(err) => return self.abort_success(subscription, err).await,
            }
        }

        let account_id = &subscription.account_id;
        let subscription_id = &subscription.subscription_id;
        let status_keys = if first_contact {
            next_state.seen_keys.iter().cloned().collect()
        } else {
            new_keys.clone()
        };
        let persisted = self
            .with_store("update_polled_state", async {
                Ok(self
                    .store
                    .update_polled_state(account_id, subscription_id, next_state)
                    .await?)
            })
            .await;
        if let Err(err) = persisted {
            return self.abort_success(subscription, err).await;
        }

        if forgiven > 0 {
            debug!(failed_attempts = forgiven, "successful report forgives earlier failures");
            let cleared = self
                .with_store("update_failed_attempts", async {
                    Ok(self
                        .store
                        .update_failed_attempts(account_id, subscription_id, 0)
                        .await?)
                })
                .await;
            if let Err(err) = cleared {
                // baseline already moved; the next success clears it again
                warn!(error = %err, "failure counter not cleared");
            }
        }

        self.record_status(subscription, PollingStatus::succeeded(status_keys, self.clock.now()))
            .await;

        Ok(ReportDisposition::Reconciled {
            new_keys,
            pruned_keys,
            message_id,
            first_contact,
        })
    }

    /// Count one failure and apply the reset / give-up policy.
    async fn record_failure(
        &self,
        subscription: &Subscription,
        error_message: Option<String>,
    ) -> Result<ReportDisposition, ReconcileError> {
        let account_id = &subscription.account_id;
        let subscription_id = &subscription.subscription_id;
        let job_id = &subscription.backing_job_id;
        let decision = self
            .config
            .failure_policy
            .on_failure(subscription.failed_attempts);

        if decision.action == FailureAction::AlreadyGivenUp {
            warn!(
                failed_attempts = decision.failed_attempts,
                "report after give-up; deleting the backing job again"
            );
            self.delete_job(job_id, account_id).await?;
        } else {
            self.with_store("update_failed_attempts", async {
                Ok(self
                    .store
                    .update_failed_attempts(account_id, subscription_id, decision.failed_attempts)
                    .await?)
            })
            .await?;

            match decision.action {
                FailureAction::ResetJob => {
                    info!(
                        failed_attempts = decision.failed_attempts,
                        "worker looks wedged; resetting the backing job"
                    );
                    self.within("reset_job", self.config.bus_timeout(), async {
                        self.lifecycle
                            .reset_job(account_id, subscription_id, job_id)
                            .await
                            .map_err(|source| ReconcileError::Lifecycle {
                                job_id: job_id.clone(),
                                source,
                            })
                    })
                    .await?;
                }
                FailureAction::GiveUp => {
                    warn!(
                        failed_attempts = decision.failed_attempts,
                        "giving up on subscription; deleting the backing job"
                    );
                    self.delete_job(job_id, account_id).await?;
                }
                FailureAction::Record | FailureAction::AlreadyGivenUp => {
                    debug!(failed_attempts = decision.failed_attempts, "failure recorded");
                }
            }
        }

        self.record_status(subscription, PollingStatus::failed(error_message, self.clock.now()))
            .await;

        Ok(ReportDisposition::FailureRecorded {
            failed_attempts: decision.failed_attempts,
            action: decision.action,
        })
    }

    /// A successful report could not be published or persisted.
    ///
    /// Timeouts count as a failed report; anything else is surfaced as is.
    /// Either way the baseline has not moved.
    async fn abort_success(
        &self,
        subscription: &Subscription,
        err: ReconcileError,
    ) -> Result<ReportDisposition, ReconcileError> {
        warn!(error = %err, "report not applied; baseline left unchanged");
        if matches!(err, ReconcileError::Timeout { .. }) {
            if let Err(count_err) = self
                .record_failure(subscription, Some(err.to_string()))
                .await
            {
                warn!(error = %count_err, "could not count timed-out report as a failure");
            }
        }
        Err(err)
    }

    fn resolve_source(
        &self,
        subscription: &Subscription,
    ) -> Result<ResolvedSource, ReconcileError> {
        let Some(source) = subscription.source.resolve() else {
            error!("unrecognized source descriptor; events for this subscription cannot be tagged");
            return Err(ReconcileError::UnrecognizedSource {
                subscription_id: subscription.subscription_id.clone(),
            });
        };

        if !source.family.serves(subscription.kind) {
            error!(
                kind = ?subscription.kind,
                source_type = ?source.source_type,
                "source descriptor cannot serve this subscription kind"
            );
            return Err(ReconcileError::SourceKindMismatch {
                subscription_id: subscription.subscription_id.clone(),
                kind: subscription.kind,
                source_type: source.source_type,
            });
        }

        Ok(source)
    }

    async fn delete_job(
        &self,
        job_id: &JobId,
        account_id: &AccountId,
    ) -> Result<(), ReconcileError> {
        self.within("delete_job", self.config.bus_timeout(), async {
            self.lifecycle
                .delete_job(job_id, account_id)
                .await
                .map_err(|source| ReconcileError::Lifecycle {
                    job_id: job_id.clone(),
                    source,
                })
        })
        .await
    }

    async fn record_status(&self, subscription: &Subscription, status: PollingStatus) {
        let recorded = tokio::time::timeout(
            self.config.bus_timeout(),
            self.status
                .record(&subscription.account_id, &subscription.routing_signatures, status),
        )
        .await;
        match recorded {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "polling status not recorded"),
            Err(_) => warn!("polling status not recorded: sink timed out"),
        }
    }

    /// Store call bounded by `store_timeout`.
    ///
    /// Only a timed-out send or baseline write counts as a failed report
    /// (see `abort_success`). A timed-out `get` has no subscription to count
    /// against, and the other writes are themselves failure bookkeeping.
    async fn with_store<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, ReconcileError>>,
    ) -> Result<T, ReconcileError> {
        self.within(operation, self.config.store_timeout(), fut).await
    }

    async fn within<T>(
        &self,
        operation: &'static str,
        limit: Duration,
        fut: impl Future<Output = Result<T, ReconcileError>>,
    ) -> Result<T, ReconcileError> {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::Timeout {
                operation,
                elapsed: limit,
            }),
        }
    }
}
