//! In-process chain for paper trading and tests.

use crate::chain::{BurnReceipt, ChainClient, ChainHead, MintReceipt};
use crate::error::ChainError;
use async_trait::async_trait;
use primitive_types::U256;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use v3lp_domain::entities::{
    BlockRange, LiquidityEvent, LiquidityEventKind, Position, SwapEvent, TickState,
};
use v3lp_domain::math::{FeeGrowthX128, sqrt_price};

const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

#[derive(Debug)]
struct SimState {
    head: ChainHead,
    swaps: Vec<SwapEvent>,
    mints: Vec<LiquidityEvent>,
    burns: Vec<LiquidityEvent>,
    ticks: HashMap<i32, TickState>,
    fee_growth: FeeGrowthX128,
    liquidity: u128,
    tick: i32,
    sqrt_price: Option<f64>,
    balance0: f64,
    balance1: f64,
    burn_fees: (f64, f64),
    next_id: u64,
    fail_next: Option<String>,
    tick_queries: usize,
}

impl SimState {
    fn check_failure(&mut self) -> Result<(), ChainError> {
        match self.fail_next.take() {
            Some(reason) => Err(ChainError::Rpc(reason)),
            None => Ok(()),
        }
    }

    fn sqrt_price(&self) -> f64 {
        self.sqrt_price
            .unwrap_or_else(|| sqrt_price(f64::from(self.tick)))
    }
}

/// A chain whose entire state is set by the caller.
///
/// The pool tick follows the most recent pushed swap unless set explicitly.
/// Wallet balances start unlimited.
#[derive(Debug)]
pub struct SimulatedChain {
    tick_spacing: i32,
    state: RwLock<SimState>,
}

impl SimulatedChain {
    /// Creates an empty pool at block 0, tick 0.
    pub fn new(tick_spacing: i32) -> Self {
        Self {
            tick_spacing,
            state: RwLock::new(SimState {
                head: ChainHead::At(0),
                swaps: Vec::new(),
                mints: Vec::new(),
                burns: Vec::new(),
                ticks: HashMap::new(),
                fee_growth: FeeGrowthX128::default(),
                liquidity: 0,
                tick: 0,
                sqrt_price: None,
                balance0: f64::INFINITY,
                balance1: f64::INFINITY,
                burn_fees: (0.0, 0.0),
                next_id: 1,
                fail_next: None,
                tick_queries: 0,
            }),
        }
    }

    /// Sets the chain head.
    pub async fn set_head(&self, block: u64) {
        self.state.write().await.head = ChainHead::At(block);
    }

    /// Makes every further head query report exhaustion.
    pub async fn exhaust(&self) {
        self.state.write().await.head = ChainHead::Exhausted;
    }

    /// Records a swap that leaves the pool at `tick`.
    pub async fn push_swap(&self, block: u64, tick: i32) {
        let mut state = self.state.write().await;
        let sqrt_price_x96 = U256::from((sqrt_price(f64::from(tick)) * Q96) as u128);
        let liquidity = state.liquidity;
        state.swaps.push(SwapEvent {
            block,
            tick,
            liquidity,
            sqrt_price_x96,
            amount0: 0,
            amount1: 0,
        });
        state.tick = tick;
        state.sqrt_price = None;
    }

    /// Records a mint or burn over `[tick_lower, tick_upper)`.
    pub async fn push_liquidity_event(
        &self,
        kind: LiquidityEventKind,
        block: u64,
        tick_lower: i32,
        tick_upper: i32,
    ) {
        let event = LiquidityEvent {
            block,
            tick_lower,
            tick_upper,
            amount0: 0,
            amount1: 0,
        };
        let mut state = self.state.write().await;
        match kind {
            LiquidityEventKind::Mint => state.mints.push(event),
            LiquidityEventKind::Burn => state.burns.push(event),
        }
    }

    /// Sets or replaces the state of an initialized tick.
    pub async fn set_tick_state(&self, tick: i32, tick_state: TickState) {
        self.state.write().await.ticks.insert(tick, tick_state);
    }

    /// Marks `tick` uninitialized.
    pub async fn clear_tick_state(&self, tick: i32) {
        self.state.write().await.ticks.remove(&tick);
    }

    /// Sets the raw global fee growth.
    pub async fn set_fee_growth(&self, fee_growth: FeeGrowthX128) {
        self.state.write().await.fee_growth = fee_growth;
    }

    /// Sets in-range pool liquidity.
    pub async fn set_liquidity(&self, liquidity: u128) {
        self.state.write().await.liquidity = liquidity;
    }

    /// Moves the pool to `tick` with the square-root price implied by it.
    pub async fn set_price_tick(&self, tick: i32) {
        let mut state = self.state.write().await;
        state.tick = tick;
        state.sqrt_price = None;
    }

    /// Overrides the square-root price independently of the tick.
    pub async fn set_sqrt_price(&self, sqrt_price: f64) {
        self.state.write().await.sqrt_price = Some(sqrt_price);
    }

    /// Sets wallet balances used by `mint`.
    pub async fn set_balances(&self, token0: f64, token1: f64) {
        let mut state = self.state.write().await;
        state.balance0 = token0;
        state.balance1 = token1;
    }

    /// Current wallet balances.
    pub async fn balances(&self) -> (f64, f64) {
        let state = self.state.read().await;
        (state.balance0, state.balance1)
    }

    /// Sets the fees every `burn` collects.
    pub async fn set_burn_fees(&self, fees0: f64, fees1: f64) {
        self.state.write().await.burn_fees = (fees0, fees1);
    }

    /// Fails the next chain call with an RPC error.
    pub async fn fail_next_call(&self, reason: impl Into<String>) {
        self.state.write().await.fail_next = Some(reason.into());
    }

    /// Number of `tick_state` queries served so far.
    pub async fn tick_queries(&self) -> usize {
        self.state.read().await.tick_queries
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    async fn current_block(&self) -> Result<ChainHead, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        Ok(state.head)
    }

    fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    async fn swap_events(&self, range: BlockRange) -> Result<Vec<SwapEvent>, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        Ok(state
            .swaps
            .iter()
            .filter(|e| range.contains(e.block))
            .copied()
            .collect())
    }

    async fn liquidity_events(
        &self,
        range: BlockRange,
        kind: LiquidityEventKind,
    ) -> Result<Vec<LiquidityEvent>, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        let events = match kind {
            LiquidityEventKind::Mint => &state.mints,
            LiquidityEventKind::Burn => &state.burns,
        };
        Ok(events
            .iter()
            .filter(|e| range.contains(e.block))
            .copied()
            .collect())
    }

    async fn tick_state(&self, tick: i32, _block: u64) -> Result<Option<TickState>, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        state.tick_queries += 1;
        Ok(state.ticks.get(&tick).filter(|t| t.initialized).copied())
    }

    async fn global_fee_growth(&self, _block: u64) -> Result<FeeGrowthX128, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        Ok(state.fee_growth)
    }

    async fn pool_liquidity(&self, _block: u64) -> Result<u128, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        Ok(state.liquidity)
    }

    async fn current_sqrt_price(&self, _block: u64) -> Result<f64, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        Ok(state.sqrt_price())
    }

    async fn current_tick(&self, _block: u64) -> Result<i32, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;
        Ok(state.tick)
    }

    async fn mint(
        &self,
        position: &Position,
        tick: i32,
        sqrt_price: f64,
    ) -> Result<MintReceipt, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;

        let amount0 = position.amount_x(tick, Some(sqrt_price));
        let amount1 = position.amount_y(tick, Some(sqrt_price));
        if amount0 > state.balance0 {
            return Err(ChainError::InsufficientBalance {
                token: 0,
                required: amount0,
                available: state.balance0,
            });
        }
        if amount1 > state.balance1 {
            return Err(ChainError::InsufficientBalance {
                token: 1,
                required: amount1,
                available: state.balance1,
            });
        }

        state.balance0 -= amount0;
        state.balance1 -= amount1;
        let external_id = state.next_id.to_string();
        state.next_id += 1;

        info!(
            external_id = %external_id,
            amount0 = amount0,
            amount1 = amount1,
            "Simulated mint"
        );

        Ok(MintReceipt {
            external_id,
            amount0,
            amount1,
        })
    }

    async fn burn(&self, position: &Position) -> Result<BurnReceipt, ChainError> {
        let mut state = self.state.write().await;
        state.check_failure()?;

        let (tick, sp) = (state.tick, state.sqrt_price());
        let amount0 = position.amount_x(tick, Some(sp));
        let amount1 = position.amount_y(tick, Some(sp));
        let (fees0, fees1) = state.burn_fees;
        state.balance0 += amount0 + fees0;
        state.balance1 += amount1 + fees1;

        debug!(
            external_id = ?position.external_id(),
            fees0 = fees0,
            fees1 = fees1,
            "Simulated burn"
        );

        Ok(BurnReceipt {
            amount0,
            amount1,
            fees0,
            fees1,
        })
    }
}
