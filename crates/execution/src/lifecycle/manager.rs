//! Position lifecycle manager.

use super::{AggregateStats, LifecycleEvent, OpenMetadata, OpenPositionView, PositionLedger};
use crate::config::RunMode;
use crate::error::ExecutionError;
use crate::sync::{SharedPoolState, TickRangeCache};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Instrument, Span, info, info_span, warn};
use v3lp_domain::entities::{Position, TickState};
use v3lp_domain::math::{FeeGrowth, virtual_from_real};
use v3lp_domain::value_objects::{Deposit, PerformanceRecord, TickRange};
use v3lp_protocols::chain::ChainClient;

/// Result of an open request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpenOutcome {
    /// The position was created at this index.
    Opened(usize),
    /// A boundary tick was uninitialized and the position was dropped.
    Discarded,
}

/// Result of a close request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseOutcome {
    /// The position was closed with this record.
    Closed(PerformanceRecord),
    /// A boundary tick was uninitialized; no record was kept.
    Discarded,
}

/// Operations the scheduler issues against positions.
#[async_trait]
pub trait PositionCommands: Send + Sync {
    /// Every open position.
    async fn open_positions(&self) -> Vec<OpenPositionView>;

    /// Opens a position over `range` funded by `deposit`.
    async fn open(&self, range: TickRange, deposit: Deposit)
    -> Result<OpenOutcome, ExecutionError>;

    /// Closes the open position at `index`.
    async fn close(&self, index: usize) -> Result<CloseOutcome, ExecutionError>;
}

/// Pool state read for one open or close.
struct Quote {
    block: u64,
    tick: i32,
    lower: TickState,
    upper: TickState,
    global: FeeGrowth,
}

/// Opens and closes positions against the synchronized pool state.
pub struct PositionManager<C: ?Sized> {
    /// Chain access.
    client: Arc<C>,
    /// Shared pool view, source of the current block.
    state: Arc<SharedPoolState>,
    /// Tick cache, consulted for uninitialized markers on open.
    cache: Arc<TickRangeCache>,
    /// Run mode.
    mode: RunMode,
    /// Positions and performance.
    ledger: RwLock<PositionLedger>,
    /// Logging span.
    span: Span,
}

impl<C: ChainClient + ?Sized> PositionManager<C> {
    /// Creates a manager with an empty ledger.
    pub fn new(
        client: Arc<C>,
        state: Arc<SharedPoolState>,
        cache: Arc<TickRangeCache>,
        mode: RunMode,
    ) -> Self {
        Self {
            client,
            state,
            cache,
            mode,
            ledger: RwLock::new(PositionLedger::new()),
            span: info_span!("position_manager"),
        }
    }

    /// Logs inside `span` instead of the default one.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Opens a position over `range` at the current block.
    ///
    /// # Errors
    /// `RangeNotInitialized` in live mode when a boundary tick has no state,
    /// `InsufficientBalance` when a live mint cannot be funded, and any chain
    /// or math failure.
    pub async fn open(
        &self,
        range: TickRange,
        deposit: Deposit,
    ) -> Result<OpenOutcome, ExecutionError> {
        self.open_inner(range, deposit)
            .instrument(self.span.clone())
            .await
    }

    async fn open_inner(
        &self,
        range: TickRange,
        deposit: Deposit,
    ) -> Result<OpenOutcome, ExecutionError> {
        let block = self
            .state
            .current_block()
            .await
            .ok_or(ExecutionError::NoBlockObserved)?;

        let Some(quote) = self.quote(range, block, true).await? else {
            self.ledger.write().await.record_open_discarded(range, block);
            info!(
                lower = range.lower(),
                upper = range.upper(),
                block = block,
                "Discarded position: boundary tick not initialized"
            );
            return Ok(OpenOutcome::Discarded);
        };

        let sqrt_price = self.client.current_sqrt_price(block).await?;
        let inside = FeeGrowth::inside(
            range.lower(),
            range.upper(),
            quote.tick,
            quote.lower.fee_growth_outside(),
            quote.upper.fee_growth_outside(),
            quote.global,
        );
        let liquidity = virtual_from_real(range.lower(), range.upper(), sqrt_price, deposit)?;

        let mut position = Position::new(quote.tick, range, liquidity.liquidity, inside);
        let (amount0, amount1) = if self.mode.submits_trades() {
            let receipt = self.client.mint(&position, quote.tick, sqrt_price).await?;
            position.bind_external_id(receipt.external_id);
            (receipt.amount0, receipt.amount1)
        } else {
            (liquidity.amount0, liquidity.amount1)
        };

        let index = self.ledger.write().await.record_opened(
            position,
            OpenMetadata {
                block: quote.block,
                tick: quote.tick,
                amount0,
                amount1,
            },
        );

        info!(
            index = index,
            lower = range.lower(),
            upper = range.upper(),
            tick = quote.tick,
            block = block,
            liquidity = liquidity.liquidity,
            "Opened position"
        );

        Ok(OpenOutcome::Opened(index))
    }

    /// Closes the open position at `index` and records its performance.
    ///
    /// The index leaves the open set before any chain call and is restored if
    /// the close fails, so concurrent closes of one index cannot both succeed.
    ///
    /// # Errors
    /// `PositionNotOpen` for an index outside the open set, otherwise as for
    /// [`open`](Self::open).
    pub async fn close(&self, index: usize) -> Result<CloseOutcome, ExecutionError> {
        self.close_inner(index)
            .instrument(self.span.clone())
            .await
    }

    async fn close_inner(&self, index: usize) -> Result<CloseOutcome, ExecutionError> {
        let position = self.ledger.write().await.claim(index)?;
        let result = self.close_claimed(index, &position).await;
        if result.is_err() {
            self.ledger.write().await.release(index);
        }
        result
    }

    async fn close_claimed(
        &self,
        index: usize,
        position: &Position,
    ) -> Result<CloseOutcome, ExecutionError> {
        let block = self
            .state
            .current_block()
            .await
            .ok_or(ExecutionError::NoBlockObserved)?;
        let (lower, upper) = position.range();
        let range = TickRange::new(lower, upper, self.client.tick_spacing())?;

        let Some(quote) = self.quote(range, block, false).await? else {
            self.ledger.write().await.record_discarded(index, block);
            info!(
                index = index,
                lower = lower,
                upper = upper,
                block = block,
                "Discarded position: boundary tick not initialized"
            );
            return Ok(CloseOutcome::Discarded);
        };

        let inside_now = FeeGrowth::inside(
            lower,
            upper,
            quote.tick,
            quote.lower.fee_growth_outside(),
            quote.upper.fee_growth_outside(),
            quote.global,
        );
        let fees = position.accumulated_fees(quote.tick, inside_now);
        let value_hold = position.value_hold(quote.tick);
        let value_position = position.value_position(quote.tick);

        if self.mode.submits_trades() {
            let receipt = self.client.burn(position).await?;
            info!(
                index = index,
                external_id = ?position.external_id(),
                fees0 = receipt.fees0,
                fees1 = receipt.fees1,
                "Burned position"
            );
        }

        let record = PerformanceRecord::new(index, block, fees, value_hold, value_position);
        self.ledger.write().await.record_closed(record, quote.tick);

        info!(
            index = index,
            lower = lower,
            upper = upper,
            tick = quote.tick,
            block = block,
            fees = record.total_fees(),
            value_hold = value_hold,
            value_position = value_position,
            "Closed position"
        );

        Ok(CloseOutcome::Closed(record))
    }

    /// Reads tick, boundary states and global fee growth at `block`.
    ///
    /// Returns `Ok(None)` when a boundary is uninitialized and this mode
    /// discards such positions.
    async fn quote(
        &self,
        range: TickRange,
        block: u64,
        trust_cached_markers: bool,
    ) -> Result<Option<Quote>, ExecutionError> {
        let tick = self.client.current_tick(block).await?;
        let lower = self
            .boundary(range.lower(), block, trust_cached_markers)
            .await?;
        let upper = self
            .boundary(range.upper(), block, trust_cached_markers)
            .await?;

        let (Some(lower), Some(upper)) = (lower, upper) else {
            if self.mode.discards_uninitialized() {
                return Ok(None);
            }
            warn!(
                lower = range.lower(),
                upper = range.upper(),
                block = block,
                "Boundary tick not initialized"
            );
            return Err(ExecutionError::RangeNotInitialized {
                lower: range.lower(),
                upper: range.upper(),
                block,
            });
        };

        let global = FeeGrowth::from_x128(self.client.global_fee_growth(block).await?);
        Ok(Some(Quote {
            block,
            tick,
            lower,
            upper,
            global,
        }))
    }

    /// Boundary tick state read from the chain at `block`.
    ///
    /// Cached fee growth outside goes stale once the price crosses the tick, so
    /// only a cached uninitialized marker is used, and only when trusted.
    async fn boundary(
        &self,
        tick: i32,
        block: u64,
        trust_cached_marker: bool,
    ) -> Result<Option<TickState>, ExecutionError> {
        if trust_cached_marker && matches!(self.cache.get(tick).await, Some(None)) {
            return Ok(None);
        }
        Ok(self.client.tick_state(tick, block).await?)
    }

    /// Every position ever opened, by index.
    pub async fn positions(&self) -> Vec<Position> {
        self.ledger.read().await.positions().to_vec()
    }

    pub async fn position(&self, index: usize) -> Option<Position> {
        self.ledger.read().await.position(index).cloned()
    }

    pub async fn metadata(&self, index: usize) -> Option<OpenMetadata> {
        self.ledger.read().await.metadata(index).copied()
    }

    pub async fn open_indices(&self) -> Vec<usize> {
        self.ledger.read().await.open_indices()
    }

    pub async fn closed_indices(&self) -> Vec<usize> {
        self.ledger.read().await.closed_indices().to_vec()
    }

    /// Performance log in close order.
    pub async fn performance(&self) -> Vec<PerformanceRecord> {
        self.ledger.read().await.performance().to_vec()
    }

    pub async fn events(&self) -> Vec<LifecycleEvent> {
        self.ledger.read().await.events().to_vec()
    }

    pub async fn aggregate_stats(&self) -> AggregateStats {
        self.ledger.read().await.aggregate_stats()
    }
}

#[async_trait]
impl<C: ChainClient + ?Sized> PositionCommands for PositionManager<C> {
    async fn open_positions(&self) -> Vec<OpenPositionView> {
        self.ledger.read().await.open_positions()
    }

    async fn open(
        &self,
        range: TickRange,
        deposit: Deposit,
    ) -> Result<OpenOutcome, ExecutionError> {
        PositionManager::open(self, range, deposit).await
    }

    async fn close(&self, index: usize) -> Result<CloseOutcome, ExecutionError> {
        PositionManager::close(self, index).await
    }
}
