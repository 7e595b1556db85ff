//! Shared view of the synchronized pool.

use super::history::BoundedHistory;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use v3lp_domain::entities::{LiquidityEvent, SwapEvent};

/// Owned copy of the synchronized pool state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSnapshot {
    /// Last block ingested.
    pub current_block: Option<u64>,
    /// Tick after the latest swap.
    pub current_tick: Option<i32>,
    /// Pool liquidity at the last tick change or mint/burn.
    pub current_liquidity: Option<u128>,
    /// Most recent swaps, oldest first.
    pub swaps: Vec<SwapEvent>,
    /// Most recent mints, oldest first.
    pub mints: Vec<LiquidityEvent>,
    /// Most recent burns, oldest first.
    pub burns: Vec<LiquidityEvent>,
}

/// Everything ingested for one advance of the synchronizer.
#[derive(Debug, Clone, Default)]
pub struct BlockAdvance {
    /// New head.
    pub block: u64,
    /// Swaps since the previous head.
    pub swaps: Vec<SwapEvent>,
    /// Mints since the previous head.
    pub mints: Vec<LiquidityEvent>,
    /// Burns since the previous head.
    pub burns: Vec<LiquidityEvent>,
    /// New current tick, if any swap happened.
    pub tick: Option<i32>,
    /// Freshly fetched pool liquidity, if it was re-read.
    pub liquidity: Option<u128>,
}

/// Progress published to waiting consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Latest tick, once one is known.
    pub tick: Option<i32>,
    /// The event source has ended.
    pub exhausted: bool,
}

#[derive(Debug)]
struct PoolView {
    current_block: Option<u64>,
    current_tick: Option<i32>,
    current_liquidity: Option<u128>,
    swaps: BoundedHistory<SwapEvent>,
    mints: BoundedHistory<LiquidityEvent>,
    burns: BoundedHistory<LiquidityEvent>,
}

/// Pool state written by the synchronizer and read by everything else.
///
/// Scalars and histories sit behind one lock, so an advance (append, trim,
/// tick update) is never observed half-applied.
#[derive(Debug)]
pub struct SharedPoolState {
    view: RwLock<PoolView>,
    status: watch::Sender<SyncStatus>,
    max_history_len: usize,
}

impl SharedPoolState {
    /// Creates an empty state keeping at most `max_history_len` events per kind.
    pub fn new(max_history_len: usize) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            view: RwLock::new(PoolView {
                current_block: None,
                current_tick: None,
                current_liquidity: None,
                swaps: BoundedHistory::new(max_history_len),
                mints: BoundedHistory::new(max_history_len),
                burns: BoundedHistory::new(max_history_len),
            }),
            status,
            max_history_len,
        }
    }

    pub fn max_history_len(&self) -> usize {
        self.max_history_len
    }

    /// Applies one advance atomically and publishes the tick.
    pub async fn advance(&self, update: BlockAdvance) {
        let mut view = self.view.write().await;
        view.current_block = Some(update.block);
        view.swaps.extend(update.swaps);
        view.mints.extend(update.mints);
        view.burns.extend(update.burns);
        if let Some(liquidity) = update.liquidity {
            view.current_liquidity = Some(liquidity);
        }
        if let Some(tick) = update.tick {
            view.current_tick = Some(tick);
            self.status.send_modify(|status| status.tick = Some(tick));
        }
    }

    /// Marks the event source as ended and wakes all waiters.
    pub fn mark_exhausted(&self) {
        self.status.send_modify(|status| status.exhausted = true);
    }

    pub fn is_exhausted(&self) -> bool {
        self.status.borrow().exhausted
    }

    /// Subscribes to tick and exhaustion updates.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Waits until a tick is known. Returns `None` if the source ends first.
    pub async fn wait_for_first_tick(&self) -> Option<i32> {
        let mut status = self.status.subscribe();
        let seen = status
            .wait_for(|s| s.tick.is_some() || s.exhausted)
            .await
            .ok()?;
        seen.tick
    }

    pub async fn current_block(&self) -> Option<u64> {
        self.view.read().await.current_block
    }

    pub async fn current_tick(&self) -> Option<i32> {
        self.view.read().await.current_tick
    }

    pub async fn current_liquidity(&self) -> Option<u128> {
        self.view.read().await.current_liquidity
    }

    /// Copies the scalars and at most `limit` recent entries per history.
    pub async fn snapshot(&self, limit: usize) -> ProtocolSnapshot {
        let view = self.view.read().await;
        ProtocolSnapshot {
            current_block: view.current_block,
            current_tick: view.current_tick,
            current_liquidity: view.current_liquidity,
            swaps: view.swaps.tail(limit),
            mints: view.mints.tail(limit),
            burns: view.burns.tail(limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use std::sync::Arc;
    use std::time::Duration;

    fn swap(block: u64, tick: i32) -> SwapEvent {
        SwapEvent {
            block,
            tick,
            liquidity: 1,
            sqrt_price_x96: U256::one() << 96,
            amount0: 0,
            amount1: 0,
        }
    }

    #[tokio::test]
    async fn test_advance_trims_and_updates_scalars() {
        let state = SharedPoolState::new(3);
        state
            .advance(BlockAdvance {
                block: 10,
                swaps: (1..=5).map(|b| swap(b, b as i32)).collect(),
                tick: Some(5),
                liquidity: Some(42),
                ..Default::default()
            })
            .await;

        let snapshot = state.snapshot(10).await;
        assert_eq!(snapshot.current_block, Some(10));
        assert_eq!(snapshot.current_tick, Some(5));
        assert_eq!(snapshot.current_liquidity, Some(42));
        assert_eq!(
            snapshot.swaps.iter().map(|s| s.block).collect::<Vec<_>>(),
            vec![3, 4, 5]
        );
        assert_eq!(state.snapshot(2).await.swaps.len(), 2);
    }

    #[tokio::test]
    async fn test_advance_without_swaps_keeps_tick() {
        let state = SharedPoolState::new(10);
        state
            .advance(BlockAdvance {
                block: 1,
                tick: Some(7),
                ..Default::default()
            })
            .await;
        state
            .advance(BlockAdvance {
                block: 2,
                ..Default::default()
            })
            .await;
        assert_eq!(state.current_block().await, Some(2));
        assert_eq!(state.current_tick().await, Some(7));
    }

    #[tokio::test]
    async fn test_first_tick_wakes_waiter() {
        let state = Arc::new(SharedPoolState::new(10));
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait_for_first_tick().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        state
            .advance(BlockAdvance {
                block: 1,
                tick: Some(-3),
                ..Default::default()
            })
            .await;

        assert_eq!(waiter.await.unwrap(), Some(-3));
    }

    #[tokio::test]
    async fn test_exhaustion_releases_waiter_without_tick() {
        let state = SharedPoolState::new(10);
        state.mark_exhausted();
        assert!(state.is_exhausted());
        assert_eq!(state.wait_for_first_tick().await, None);
    }
}
