//! The chain client contract consumed by the engine.

use crate::error::ChainError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use v3lp_domain::entities::{
    BlockRange, LiquidityEvent, LiquidityEventKind, Position, SwapEvent, TickState,
};
use v3lp_domain::math::FeeGrowthX128;

/// Result of a current-block query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainHead {
    /// Latest block available.
    At(u64),
    /// A replayed source has no more blocks.
    Exhausted,
}

impl ChainHead {
    /// Block number, if the source is not exhausted.
    #[must_use]
    pub fn block(self) -> Option<u64> {
        match self {
            ChainHead::At(block) => Some(block),
            ChainHead::Exhausted => None,
        }
    }
}

/// Outcome of a live mint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Identifier assigned to the position by the chain.
    pub external_id: String,
    /// Token0 actually deposited.
    pub amount0: f64,
    /// Token1 actually deposited.
    pub amount1: f64,
}

/// Outcome of a live burn and collect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnReceipt {
    /// Token0 withdrawn, excluding fees.
    pub amount0: f64,
    /// Token1 withdrawn, excluding fees.
    pub amount1: f64,
    /// Token0 fees collected.
    pub fees0: f64,
    /// Token1 fees collected.
    pub fees1: f64,
}

/// Read and write access to one pool.
///
/// Fee growth is returned raw (Q128.128); callers normalize it.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest block, or [`ChainHead::Exhausted`] when a replay has ended.
    async fn current_block(&self) -> Result<ChainHead, ChainError>;

    /// Pool tick spacing.
    fn tick_spacing(&self) -> i32;

    /// Swaps in `range`, in block order.
    async fn swap_events(&self, range: BlockRange) -> Result<Vec<SwapEvent>, ChainError>;

    /// Mints or burns in `range`, in block order.
    async fn liquidity_events(
        &self,
        range: BlockRange,
        kind: LiquidityEventKind,
    ) -> Result<Vec<LiquidityEvent>, ChainError>;

    /// State of `tick` at `block`; `None` when the tick is not initialized.
    async fn tick_state(&self, tick: i32, block: u64) -> Result<Option<TickState>, ChainError>;

    /// Raw global fee growth at `block`.
    async fn global_fee_growth(&self, block: u64) -> Result<FeeGrowthX128, ChainError>;

    /// In-range pool liquidity at `block`.
    async fn pool_liquidity(&self, block: u64) -> Result<u128, ChainError>;

    /// Square-root price at `block`, as a real value.
    async fn current_sqrt_price(&self, block: u64) -> Result<f64, ChainError>;

    /// Pool tick at `block`.
    async fn current_tick(&self, block: u64) -> Result<i32, ChainError>;

    /// Mints `position` on-chain.
    async fn mint(
        &self,
        _position: &Position,
        _tick: i32,
        _sqrt_price: f64,
    ) -> Result<MintReceipt, ChainError> {
        Err(ChainError::Unsupported("mint"))
    }

    /// Burns `position` and collects its fees.
    async fn burn(&self, _position: &Position) -> Result<BurnReceipt, ChainError> {
        Err(ChainError::Unsupported("burn"))
    }
}

#[async_trait]
impl<C: ChainClient + ?Sized> ChainClient for Arc<C> {
    async fn current_block(&self) -> Result<ChainHead, ChainError> {
        (**self).current_block().await
    }

    fn tick_spacing(&self) -> i32 {
        (**self).tick_spacing()
    }

    async fn swap_events(&self, range: BlockRange) -> Result<Vec<SwapEvent>, ChainError> {
        (**self).swap_events(range).await
    }

    async fn liquidity_events(
        &self,
        range: BlockRange,
        kind: LiquidityEventKind,
    ) -> Result<Vec<LiquidityEvent>, ChainError> {
        (**self).liquidity_events(range, kind).await
    }

    async fn tick_state(&self, tick: i32, block: u64) -> Result<Option<TickState>, ChainError> {
        (**self).tick_state(tick, block).await
    }

    async fn global_fee_growth(&self, block: u64) -> Result<FeeGrowthX128, ChainError> {
        (**self).global_fee_growth(block).await
    }

    async fn pool_liquidity(&self, block: u64) -> Result<u128, ChainError> {
        (**self).pool_liquidity(block).await
    }

    async fn current_sqrt_price(&self, block: u64) -> Result<f64, ChainError> {
        (**self).current_sqrt_price(block).await
    }

    async fn current_tick(&self, block: u64) -> Result<i32, ChainError> {
        (**self).current_tick(block).await
    }

    async fn mint(
        &self,
        position: &Position,
        tick: i32,
        sqrt_price: f64,
    ) -> Result<MintReceipt, ChainError> {
        (**self).mint(position, tick, sqrt_price).await
    }

    async fn burn(&self, position: &Position) -> Result<BurnReceipt, ChainError> {
        (**self).burn(position).await
    }
}
