//! Events - 外部に出ていくもの
//!
//! - `ChangeEvent`: bus に載る唯一のメッセージ（Artifact / Manifest）
//! - `PollingStatus`: trigger 側に見せる最新のポーリング結果

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::AccountId;
use super::source::SourceType;

/// "These items appeared together" notification.
///
/// Never split: one report produces at most one event, carrying every new key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub account_id: AccountId,
    pub routing_signatures: Vec<String>,
    pub source_type: SourceType,
    pub source_name: String,
    pub new_keys: Vec<String>,
}

/// Latest polling result, recorded per routing signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingStatus {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default)]
    pub last_polled_keys: Vec<String>,

    pub updated_at: DateTime<Utc>,
}

impl PollingStatus {
    pub fn succeeded(last_polled_keys: Vec<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            error_message: None,
            last_polled_keys,
            updated_at,
        }
    }

    pub fn failed(error_message: Option<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            error_message,
            last_polled_keys: Vec::new(),
            updated_at,
        }
    }
}
