//! Domain model (ids, subscriptions, reports, diffing, failure policy).
//!
//! Nothing here touches a store, a bus or a clock.

pub mod detect;
pub mod errors;
pub mod events;
pub mod ids;
pub mod policy;
pub mod report;
pub mod source;
pub mod subscription;

pub use self::detect::{Detection, detect, detect_observation};
pub use self::errors::{
    ErrorKind, LifecycleError, PublishError, ReconcileError, StatusError, StoreError,
};
pub use self::events::{ChangeEvent, PollingStatus};
pub use self::ids::{AccountId, JobId, MessageId, SubscriptionId};
pub use self::policy::{FailureAction, FailureDecision, FailurePolicy};
pub use self::report::{
    ArtifactPayload, KindPayload, ManifestPayload, Observation, Report, ReportOutcome,
    ReportPayload, WebhookDelivery, WebhookDeliveryPayload,
};
pub use self::source::{ResolvedSource, SourceDescriptor, SourceFamily, SourceType};
pub use self::subscription::{PolledState, Subscription, SubscriptionKind};
