//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（subscription の正本、event bus、perpetual task
//! サービス、trigger の状態表示）へのインターフェースを提供し、
//! 実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - store が source of truth（正本）
//! - bus への配送保証は bus 側の責務（ここでは一度だけ渡す）
//! - すべての呼び出しは coordinator 側で timeout を掛ける

pub mod clock;
pub mod event_publisher;
pub mod id_generator;
pub mod job_lifecycle;
pub mod status_sink;
pub mod subscription_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_publisher::{EventPublisher, WebhookRedelivery};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_lifecycle::JobLifecycle;
pub use self::status_sink::PollingStatusSink;
pub use self::subscription_store::SubscriptionStore;
