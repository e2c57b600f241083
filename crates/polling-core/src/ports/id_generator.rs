//! IdGenerator port - ID 生成の抽象化
//!
//! bus に載せた message の ID を採番する。外部 ID（account, subscription, job）は
//! provisioning 側が採番するのでここには無い。

use crate::domain::MessageId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は時刻でソート可能な ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数の report を並行処理するため）
pub trait IdGenerator: Send + Sync {
    fn generate_message_id(&self) -> MessageId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使うと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_message_id(&self) -> MessageId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        MessageId::from(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_message_id();
        let id2 = id_gen.generate_message_id();

        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("msg-"));
    }

    #[test]
    fn ulid_generator_with_fixed_clock_pins_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_message_id();
        let id2 = id_gen.generate_message_id();

        // ランダム部分があるので ID は異なるが、timestamp 部分は同じ
        assert_ne!(id1, id2);
        let timestamp1 = (id1.as_ulid().0 >> 80) as u64;
        let timestamp2 = (id2.as_ulid().0 >> 80) as u64;
        assert_eq!(timestamp1, timestamp2);
        assert_eq!(timestamp1, fixed_time.timestamp_millis() as u64);
    }
}
