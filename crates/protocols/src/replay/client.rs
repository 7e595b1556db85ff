//! Chain client replaying an [`EventLog`].

use super::records::EventLog;
use crate::chain::{ChainClient, ChainHead};
use crate::error::ChainError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use v3lp_domain::entities::{BlockRange, LiquidityEvent, LiquidityEventKind, SwapEvent, TickState};
use v3lp_domain::math::FeeGrowthX128;

/// Serves recorded events block by block.
///
/// Every `current_block` call advances the cursor by one block, starting at
/// the first recorded block. Once the cursor passes the last recorded block
/// the client reports [`ChainHead::Exhausted`]. Pool state at a block (ticks,
/// fee growth, liquidity, price) comes from the wrapped `state` client.
pub struct ReplayChainClient<S> {
    log: EventLog,
    state: S,
    cursor: AtomicU64,
    last_block: u64,
}

impl<S: ChainClient> ReplayChainClient<S> {
    /// Creates a replay over `log`, answering state queries with `state`.
    pub fn new(log: EventLog, state: S) -> Self {
        let first = log.first_block().unwrap_or(0);
        let last = log.last_block().unwrap_or(0);
        info!(first_block = first, last_block = last, "Replay client ready");
        Self {
            cursor: AtomicU64::new(first),
            last_block: last,
            log,
            state,
        }
    }

    /// Restarts the replay at `block`.
    pub fn seek(&self, block: u64) {
        self.cursor.store(block, Ordering::SeqCst);
    }

    /// Block the next `current_block` call will report.
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::SeqCst)
    }

    /// The recorded events.
    pub fn log(&self) -> &EventLog {
        &self.log
    }
}

#[async_trait]
impl<S: ChainClient> ChainClient for ReplayChainClient<S> {
    async fn current_block(&self) -> Result<ChainHead, ChainError> {
        let block = self.cursor.fetch_add(1, Ordering::SeqCst);
        if block > self.last_block {
            return Ok(ChainHead::Exhausted);
        }
        Ok(ChainHead::At(block))
    }

    fn tick_spacing(&self) -> i32 {
        self.state.tick_spacing()
    }

    async fn swap_events(&self, range: BlockRange) -> Result<Vec<SwapEvent>, ChainError> {
        Ok(self.log.swaps_in(range).to_vec())
    }

    async fn liquidity_events(
        &self,
        range: BlockRange,
        kind: LiquidityEventKind,
    ) -> Result<Vec<LiquidityEvent>, ChainError> {
        Ok(self.log.liquidity_events_in(range, kind).to_vec())
    }

    async fn tick_state(&self, tick: i32, block: u64) -> Result<Option<TickState>, ChainError> {
        self.state.tick_state(tick, block).await
    }

    async fn global_fee_growth(&self, block: u64) -> Result<FeeGrowthX128, ChainError> {
        self.state.global_fee_growth(block).await
    }

    async fn pool_liquidity(&self, block: u64) -> Result<u128, ChainError> {
        self.state.pool_liquidity(block).await
    }

    async fn current_sqrt_price(&self, block: u64) -> Result<f64, ChainError> {
        self.state.current_sqrt_price(block).await
    }

    async fn current_tick(&self, block: u64) -> Result<i32, ChainError> {
        self.state.current_tick(block).await
    }
}
