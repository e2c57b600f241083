//! Source descriptors: which external source a subscription watches.
//!
//! The set of shapes is closed. Stored data that carries any other tag
//! deserializes into [`SourceDescriptor::Unrecognized`], and resolving it is a
//! loud configuration error rather than a silent drop.

use serde::{Deserialize, Serialize};

use super::subscription::SubscriptionKind;

/// Source type attached to every outbound change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    DockerHub,
    Ecr,
    Gcr,
    Acr,
    Nexus3,
    Artifactory,
    GoogleArtifactRegistry,
    GithubPackages,
    AmazonS3,
    Jenkins,
    CustomArtifact,
    HttpHelm,
    S3Helm,
    GcsHelm,
    GitPoll,
}

/// Family a descriptor belongs to; must agree with the subscription kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFamily {
    Registry,
    ChartStore,
    GitHost,
}

impl SourceFamily {
    pub fn serves(self, kind: SubscriptionKind) -> bool {
        matches!(
            (self, kind),
            (SourceFamily::Registry, SubscriptionKind::Artifact)
                | (SourceFamily::ChartStore, SubscriptionKind::Manifest)
                | (SourceFamily::GitHost, SubscriptionKind::WebhookDelivery)
        )
    }
}

/// Kind-specific description of the watched source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDescriptor {
    DockerHub {
        image_path: String,
    },
    Ecr {
        image_path: String,
        #[serde(default)]
        region: Option<String>,
    },
    Gcr {
        image_path: String,
    },
    Acr {
        registry: String,
        repository: String,
    },
    Nexus3 {
        repository: String,
        artifact: String,
    },
    Artifactory {
        repository: String,
        artifact_path: String,
    },
    GoogleArtifactRegistry {
        package: String,
    },
    GithubPackages {
        package_name: String,
    },
    AmazonS3 {
        bucket: String,
        #[serde(default)]
        file_path_regex: Option<String>,
    },
    Jenkins {
        job_name: String,
    },
    CustomArtifact {
        script_name: String,
    },
    HttpHelm {
        chart_name: String,
    },
    S3Helm {
        chart_name: String,
    },
    GcsHelm {
        chart_name: String,
    },
    GitPoll {
        repository: String,
        webhook_id: String,
    },
    #[serde(other)]
    Unrecognized,
}

/// Stable tagging pair used on outbound events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub name: String,
    pub source_type: SourceType,
    pub family: SourceFamily,
}

impl SourceDescriptor {
    /// Resolve `(name, type)`; `None` for shapes nobody mapped.
    pub fn resolve(&self) -> Option<ResolvedSource> {
        use SourceFamily::*;

        let (name, source_type, family) = match self {
            Self::DockerHub { image_path } => (image_path, SourceType::DockerHub, Registry),
            Self::Ecr { image_path, .. } => (image_path, SourceType::Ecr, Registry),
            Self::Gcr { image_path } => (image_path, SourceType::Gcr, Registry),
            Self::Acr { repository, .. } => (repository, SourceType::Acr, Registry),
            Self::Nexus3 { artifact, .. } => (artifact, SourceType::Nexus3, Registry),
            Self::Artifactory { artifact_path, .. } => {
                (artifact_path, SourceType::Artifactory, Registry)
            }
            Self::GoogleArtifactRegistry { package } => {
                (package, SourceType::GoogleArtifactRegistry, Registry)
            }
            Self::GithubPackages { package_name } => {
                (package_name, SourceType::GithubPackages, Registry)
            }
            Self::AmazonS3 { bucket, .. } => (bucket, SourceType::AmazonS3, Registry),
            Self::Jenkins { job_name } => (job_name, SourceType::Jenkins, Registry),
            Self::CustomArtifact { script_name } => {
                (script_name, SourceType::CustomArtifact, Registry)
            }
            Self::HttpHelm { chart_name } => (chart_name, SourceType::HttpHelm, ChartStore),
            Self::S3Helm { chart_name } => (chart_name, SourceType::S3Helm, ChartStore),
            Self::GcsHelm { chart_name } => (chart_name, SourceType::GcsHelm, ChartStore),
            Self::GitPoll { repository, .. } => (repository, SourceType::GitPoll, GitHost),
            Self::Unrecognized => return None,
        };

        Some(ResolvedSource {
            name: name.clone(),
            source_type,
            family,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::docker(
        SourceDescriptor::DockerHub { image_path: "imagePath".into() },
        "imagePath",
        SourceType::DockerHub
    )]
    #[case::gar(
        SourceDescriptor::GoogleArtifactRegistry { package: "pkg".into() },
        "pkg",
        SourceType::GoogleArtifactRegistry
    )]
    #[case::nexus(
        SourceDescriptor::Nexus3 { repository: "releases".into(), artifact: "app".into() },
        "app",
        SourceType::Nexus3
    )]
    #[case::s3_helm(
        SourceDescriptor::S3Helm { chart_name: "chartName".into() },
        "chartName",
        SourceType::S3Helm
    )]
    fn resolves_name_and_type(
        #[case] descriptor: SourceDescriptor,
        #[case] name: &str,
        #[case] source_type: SourceType,
    ) {
        let resolved = descriptor.resolve().unwrap();
        assert_eq!(resolved.name, name);
        assert_eq!(resolved.source_type, source_type);
    }

    #[test]
    fn unknown_tag_deserializes_as_unrecognized() {
        let d: SourceDescriptor =
            serde_json::from_value(serde_json::json!({"type": "azure_devops_feed", "feed": "x"}))
                .unwrap();
        assert_eq!(d, SourceDescriptor::Unrecognized);
        assert!(d.resolve().is_none());
    }

    #[test]
    fn families_serve_only_their_kind() {
        assert!(SourceFamily::Registry.serves(SubscriptionKind::Artifact));
        assert!(!SourceFamily::Registry.serves(SubscriptionKind::Manifest));
        assert!(SourceFamily::ChartStore.serves(SubscriptionKind::Manifest));
        assert!(SourceFamily::GitHost.serves(SubscriptionKind::WebhookDelivery));
        assert!(!SourceFamily::GitHost.serves(SubscriptionKind::Artifact));
    }
}
