//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて report の突き合わせを実装します。
//!
//! # 主要コンポーネント
//! - **ReconcilerBuilder**: coordinator の構築とワイヤリング
//! - **ReconciliationCoordinator**: report 一件の処理（lock → load → diff → publish → persist）
//! - **ReconcilerConfig**: failure policy とタイムアウト
//! - **SubscriptionLocks**: subscription 単位の直列化

pub mod builder;
pub mod config;
pub mod coordinator;
pub mod locks;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, ReconcilerBuilder};
pub use self::config::{ConfigError, ReconcilerConfig};
pub use self::coordinator::{ReconciliationCoordinator, ReportDisposition};
pub use self::locks::{SubscriptionGuard, SubscriptionLocks};
