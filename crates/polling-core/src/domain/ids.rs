//! Domain identifiers (strongly-typed IDs).
//!
//! # 二種類の ID
//! - **`Key<T>`**: 外部から渡される文字列 ID（account, subscription, backing job, delivery）。
//!   provisioning 側が採番するので、ここでは検証も生成もしない。
//! - **`Id<T>`**: このクレートが採番する ULID ベースの ID（bus に載せた message の ID）。
//!
//! どちらも Phantom type パターンで、`SubscriptionId` と `JobId` のような
//! 同じ表現の ID を取り違えるとコンパイルエラーになります。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"msg-" など）を提供します。
/// 外部 ID はプレフィックスを付けずに表示するので空文字を返します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// 外部採番の文字列 ID
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Key<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> From<&str> for Key<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Key<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

/// ULID ベースの内部採番 ID
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Account {}

impl IdMarker for Account {
    fn prefix() -> &'static str {
        ""
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subscription {}

impl IdMarker for Subscription {
    fn prefix() -> &'static str {
        ""
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackingJob {}

impl IdMarker for BackingJob {
    fn prefix() -> &'static str {
        ""
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Message {}

impl IdMarker for Message {
    fn prefix() -> &'static str {
        "msg-"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Tenant the subscription belongs to.
pub type AccountId = Key<Account>;

/// Identifier of a subscription (polling document).
pub type SubscriptionId = Key<Subscription>;

/// Identifier of the recurring background job that produces reports.
pub type JobId = Key<BackingJob>;

/// Identifier the bus assigns to one published change event.
pub type MessageId = Id<Message>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_display_their_raw_value() {
        let account = AccountId::new("acct-1");
        let job: JobId = "pt-42".into();

        assert_eq!(account.to_string(), "acct-1");
        assert_eq!(job.as_str(), "pt-42");

        // let _: SubscriptionId = job; // <- does not compile
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let id = SubscriptionId::new("doc-7");
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, "\"doc-7\"");

        let back: SubscriptionId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn message_ids_carry_prefix() {
        let id = MessageId::from_ulid(Ulid::new());
        assert!(id.to_string().starts_with("msg-"));
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<MessageId>(), size_of::<Ulid>());
        assert_eq!(size_of::<JobId>(), size_of::<String>());
    }
}
