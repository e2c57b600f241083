//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の in-memory 実装を含めます。
//! CLI のリプレイと単体テストの両方で使います。
//!
//! # 含まれる実装
//! - **InMemorySubscriptionStore**: subscription の正本
//! - **InMemoryEventBus / InMemoryWebhookRedelivery**: 送信先
//! - **InMemoryJobLifecycle**: perpetual task サービス
//! - **InMemoryPollingStatus**: trigger の状態表示
//!
//! すべて `Fault` で失敗・遅延を注入できます。

pub mod fault;
pub mod inmem_bus;
pub mod inmem_jobs;
pub mod inmem_status;
pub mod inmem_store;

// 主要な型を再エクスポート
pub use self::fault::Fault;
pub use self::inmem_bus::{
    InMemoryEventBus, InMemoryWebhookRedelivery, PublishedMessage, Redelivered,
};
pub use self::inmem_jobs::{InMemoryJobLifecycle, JobRequest};
pub use self::inmem_status::InMemoryPollingStatus;
pub use self::inmem_store::{InMemorySubscriptionStore, StoreWrite};
