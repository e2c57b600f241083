//! Report model: what one worker observation cycle sends back.
//!
//! The payload is a sealed set of kind-specific shapes. Each shape knows how
//! to reduce itself to an [`Observation`], which is all the change detector
//! ever sees.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::ids::{AccountId, SubscriptionId};
use super::subscription::SubscriptionKind;

/// Kind-independent view of a successful report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub reported_keys: Vec<String>,
    pub explicit_deletes: Vec<String>,
    pub first_from_worker: bool,
}

/// One kind-specific payload shape.
pub trait KindPayload {
    const KIND: SubscriptionKind;

    fn observation(&self) -> Observation;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPayload {
    #[serde(default)]
    pub unpublished_artifact_keys: Vec<String>,
    #[serde(default)]
    pub to_be_deleted_keys: Vec<String>,
    #[serde(default)]
    pub first_collection_on_worker: bool,
}

impl KindPayload for ArtifactPayload {
    const KIND: SubscriptionKind = SubscriptionKind::Artifact;

    fn observation(&self) -> Observation {
        Observation {
            reported_keys: self.unpublished_artifact_keys.clone(),
            explicit_deletes: self.to_be_deleted_keys.clone(),
            first_from_worker: self.first_collection_on_worker,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPayload {
    #[serde(default)]
    pub unpublished_versions: Vec<String>,
    #[serde(default)]
    pub to_be_deleted_keys: Vec<String>,
    #[serde(default)]
    pub first_collection_on_worker: bool,
}

impl KindPayload for ManifestPayload {
    const KIND: SubscriptionKind = SubscriptionKind::Manifest;

    fn observation(&self) -> Observation {
        Observation {
            reported_keys: self.unpublished_versions.clone(),
            explicit_deletes: self.to_be_deleted_keys.clone(),
            first_from_worker: self.first_collection_on_worker,
        }
    }
}

/// A webhook delivery captured by polling a git host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub delivery_id: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookDeliveryPayload {
    #[serde(default)]
    pub unpublished_deliveries: Vec<WebhookDelivery>,
    #[serde(default)]
    pub to_be_deleted_ids: Vec<String>,
    #[serde(default)]
    pub first_collection_on_worker: bool,
}

impl WebhookDeliveryPayload {
    /// Deliveries whose ids are in `ids`, in report order, first occurrence only.
    pub fn deliveries_for(&self, ids: &[String]) -> Vec<WebhookDelivery> {
        let mut seen = HashSet::new();
        let mut picked = Vec::new();
        for delivery in &self.unpublished_deliveries {
            if ids.contains(&delivery.delivery_id) && seen.insert(delivery.delivery_id.as_str()) {
                picked.push(delivery.clone());
            }
        }
        picked
    }
}

impl KindPayload for WebhookDeliveryPayload {
    const KIND: SubscriptionKind = SubscriptionKind::WebhookDelivery;

    fn observation(&self) -> Observation {
        Observation {
            reported_keys: self
                .unpublished_deliveries
                .iter()
                .map(|d| d.delivery_id.clone())
                .collect(),
            explicit_deletes: self.to_be_deleted_ids.clone(),
            first_from_worker: self.first_collection_on_worker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportPayload {
    Artifact(ArtifactPayload),
    Manifest(ManifestPayload),
    WebhookDelivery(WebhookDeliveryPayload),
}

impl ReportPayload {
    pub fn kind(&self) -> SubscriptionKind {
        match self {
            ReportPayload::Artifact(_) => ArtifactPayload::KIND,
            ReportPayload::Manifest(_) => ManifestPayload::KIND,
            ReportPayload::WebhookDelivery(_) => WebhookDeliveryPayload::KIND,
        }
    }

    pub fn observation(&self) -> Observation {
        match self {
            ReportPayload::Artifact(p) => p.observation(),
            ReportPayload::Manifest(p) => p.observation(),
            ReportPayload::WebhookDelivery(p) => p.observation(),
        }
    }
}

/// Result of the worker's cycle.
///
/// Serialized as SCREAMING_SNAKE_CASE: SUCCESS / FAILURE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportOutcome {
    Success {
        payload: ReportPayload,
    },
    Failure {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
    },
}

/// Unit of work sent by the remote worker. Applied fully or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub account_id: AccountId,
    pub subscription_id: SubscriptionId,
    pub outcome: ReportOutcome,
}

impl Report {
    pub fn success(
        account_id: impl Into<AccountId>,
        subscription_id: impl Into<SubscriptionId>,
        payload: ReportPayload,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            subscription_id: subscription_id.into(),
            outcome: ReportOutcome::Success { payload },
        }
    }

    pub fn failure(
        account_id: impl Into<AccountId>,
        subscription_id: impl Into<SubscriptionId>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            subscription_id: subscription_id.into(),
            outcome: ReportOutcome::Failure {
                error_message: Some(error_message.into()),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ReportOutcome::Failure { .. })
    }
}
