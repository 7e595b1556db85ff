//! Shared helpers for integration tests.

#![allow(dead_code)]

use primitive_types::U256;
use std::future::Future;
use std::sync::Once;
use std::time::Duration;
use v3lp_domain::entities::TickState;
use v3lp_protocols::simulated::SimulatedChain;

static INIT: Once = Once::new();

/// Routes `tracing` output to the test harness once per binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init();
    });
}

/// Marks every spacing-aligned tick in `[from, to]` initialized with zero outside growth.
pub async fn initialize_ticks(chain: &SimulatedChain, from: i32, to: i32, spacing: i32) {
    let mut tick = from;
    while tick <= to {
        chain
            .set_tick_state(tick, TickState::new(0, U256::zero(), U256::zero()))
            .await;
        tick += spacing;
    }
}

/// Polls `check` every few milliseconds until it holds or `timeout` passes.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
