//! Subscription (polling document) and its persisted baseline.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ids::{AccountId, JobId, SubscriptionId};
use super::source::SourceDescriptor;

/// What a subscription watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionKind {
    Artifact,
    Manifest,
    WebhookDelivery,
}

/// Full set of item keys already announced downstream (or taken as baseline
/// on first contact). Replaced wholesale on every successful report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolledState {
    pub seen_keys: BTreeSet<String>,
}

impl PolledState {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen_keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen_keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.seen_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_keys.is_empty()
    }
}

/// Durable record of "watch this source and tell these consumers about new
/// items". Created by provisioning, mutated by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub account_id: AccountId,
    pub subscription_id: SubscriptionId,
    pub kind: SubscriptionKind,

    /// Job currently expected to report for this subscription.
    pub backing_job_id: JobId,

    /// Opaque tags used to address downstream consumers.
    #[serde(default)]
    pub routing_signatures: Vec<String>,

    pub source: SourceDescriptor,

    #[serde(default)]
    pub failed_attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polled_state: Option<PolledState>,
}

impl Subscription {
    pub fn new(
        account_id: AccountId,
        subscription_id: SubscriptionId,
        kind: SubscriptionKind,
        backing_job_id: JobId,
        source: SourceDescriptor,
    ) -> Self {
        Self {
            account_id,
            subscription_id,
            kind,
            backing_job_id,
            routing_signatures: Vec::new(),
            source,
            failed_attempts: 0,
            polled_state: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.routing_signatures.push(signature.into());
        self
    }

    pub fn with_polled_state(mut self, state: PolledState) -> Self {
        self.polled_state = Some(state);
        self
    }

    pub fn with_failed_attempts(mut self, failed_attempts: u32) -> Self {
        self.failed_attempts = failed_attempts;
        self
    }

    /// A subscription nobody can be notified about.
    pub fn is_degenerate(&self) -> bool {
        self.routing_signatures.is_empty()
    }

    pub fn is_backed_by(&self, job_id: &JobId) -> bool {
        &self.backing_job_id == job_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker() -> SourceDescriptor {
        SourceDescriptor::DockerHub {
            image_path: "library/nginx".into(),
        }
    }

    #[test]
    fn subscription_without_signatures_is_degenerate() {
        let sub = Subscription::new(
            "acct".into(),
            "doc".into(),
            SubscriptionKind::Artifact,
            "pt".into(),
            docker(),
        );
        assert!(sub.is_degenerate());
        assert!(!sub.with_signature("sig").is_degenerate());
    }

    #[test]
    fn polled_state_collapses_duplicates() {
        let state = PolledState::new(["v1", "v2", "v1"]);
        assert_eq!(state.len(), 2);
        assert!(state.contains("v2"));
    }

    #[test]
    fn subscription_deserializes_with_defaults() {
        let sub: Subscription = serde_json::from_value(serde_json::json!({
            "account_id": "acct",
            "subscription_id": "doc",
            "kind": "MANIFEST",
            "backing_job_id": "pt",
            "source": {"type": "http_helm", "chart_name": "chartName"}
        }))
        .unwrap();

        assert_eq!(sub.kind, SubscriptionKind::Manifest);
        assert_eq!(sub.failed_attempts, 0);
        assert!(sub.polled_state.is_none());
        assert!(sub.is_degenerate());
    }
}
