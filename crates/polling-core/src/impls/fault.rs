//! Fault injection shared by the in-memory adapters.
//!
//! Lets tests make an adapter fail or stall without a mock framework.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Fault {
    failing: AtomicBool,
    stall_ms: AtomicU64,
}

impl Fault {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_stall(&self, stall: Duration) {
        self.stall_ms
            .store(stall.as_millis() as u64, Ordering::SeqCst);
    }

    /// Sleep for the configured stall, then fail if told to.
    pub async fn trip(&self, operation: &str) -> Result<(), String> {
        let stall_ms = self.stall_ms.load(Ordering::SeqCst);
        if stall_ms > 0 {
            tokio::time::sleep(Duration::from_millis(stall_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(format!("injected failure in {operation}"));
        }
        Ok(())
    }
}
