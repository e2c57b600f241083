//! polling-core
//!
//! Reconciles polling reports from remote workers against the last announced
//! state of each subscription, and announces only what is new.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, subscription, report, source, detect, policy, events, errors）
//! - **ports**: 抽象化レイヤー（SubscriptionStore, EventPublisher, JobLifecycle, など）
//! - **app**: アプリケーションロジック（builder, coordinator, config, locks）
//! - **impls**: 実装（InMemorySubscriptionStore など開発用）
//! - **telemetry**: tracing の初期化

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod telemetry;
