//! Ledger of positions and their realized performance.

use super::{
    DiscardStage, EventData, LifecycleEvent, PositionClosedData, PositionDiscardedData,
    PositionOpenedData,
};
use crate::error::ExecutionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use v3lp_domain::entities::Position;
use v3lp_domain::value_objects::{PerformanceRecord, TickRange};

/// Conditions a position was opened under.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenMetadata {
    /// Block of the open.
    pub block: u64,
    /// Pool tick at open.
    pub tick: i32,
    /// Token0 committed.
    pub amount0: f64,
    /// Token1 committed.
    pub amount1: f64,
}

/// What the scheduler sees of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPositionView {
    /// Ledger index.
    pub index: usize,
    /// Block of the open.
    pub opened_block: u64,
    /// Lower tick.
    pub lower_tick: i32,
    /// Upper tick.
    pub upper_tick: i32,
}

/// Aggregate statistics across all positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Positions ever opened.
    pub total_positions: u32,
    /// Currently open positions.
    pub open_positions: u32,
    /// Closed positions with a performance record.
    pub closed_positions: u32,
    /// Opens and closes dropped over uninitialized ticks.
    pub discarded: u32,
    /// Fees earned, in token1.
    pub total_fees: f64,
    /// Summed position value at close.
    pub total_value_position: f64,
    /// Summed hold value at close.
    pub total_value_hold: f64,
    /// Position value plus fees minus hold value.
    pub net_vs_hold: f64,
}

/// Positions, their state sets and the performance log.
///
/// Every index is in at most one of the open, closed and discarded sets.
/// Positions are never removed.
#[derive(Debug, Default)]
pub struct PositionLedger {
    positions: Vec<Position>,
    metadata: Vec<OpenMetadata>,
    open: BTreeSet<usize>,
    claimed: BTreeSet<usize>,
    closed: Vec<usize>,
    discarded: Vec<usize>,
    discarded_opens: u32,
    performance: Vec<PerformanceRecord>,
    events: Vec<LifecycleEvent>,
}

impl PositionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new open position and returns its index.
    pub fn record_opened(&mut self, position: Position, metadata: OpenMetadata) -> usize {
        let index = self.positions.len();
        self.events.push(LifecycleEvent::new(
            Some(index),
            metadata.block,
            EventData::PositionOpened(PositionOpenedData {
                tick_lower: position.lower_tick(),
                tick_upper: position.upper_tick(),
                tick: metadata.tick,
                liquidity: position.liquidity(),
                amount0: metadata.amount0,
                amount1: metadata.amount1,
                external_id: position.external_id().map(str::to_string),
            }),
        ));
        self.positions.push(position);
        self.metadata.push(metadata);
        self.open.insert(index);
        index
    }

    /// Records an open dropped before a position was created.
    pub fn record_open_discarded(&mut self, range: TickRange, block: u64) {
        self.discarded_opens += 1;
        self.events.push(LifecycleEvent::new(
            None,
            block,
            EventData::PositionDiscarded(PositionDiscardedData {
                tick_lower: range.lower(),
                tick_upper: range.upper(),
                stage: DiscardStage::Open,
            }),
        ));
    }

    /// Takes `index` out of the open set for closing and returns its position.
    ///
    /// # Errors
    /// Returns `PositionNotOpen` if the index is not open or already being closed.
    pub fn claim(&mut self, index: usize) -> Result<Position, ExecutionError> {
        if !self.open.remove(&index) {
            return Err(ExecutionError::PositionNotOpen(index));
        }
        self.claimed.insert(index);
        Ok(self.positions[index].clone())
    }

    /// Returns a claimed index to the open set after a failed close.
    pub fn release(&mut self, index: usize) {
        if self.claimed.remove(&index) {
            self.open.insert(index);
        }
    }

    /// Completes the close of a claimed index.
    pub fn record_closed(&mut self, record: PerformanceRecord, tick: i32) {
        let index = record.position_index;
        self.claimed.remove(&index);
        self.closed.push(index);
        self.events.push(LifecycleEvent::new(
            Some(index),
            record.closed_at_block,
            EventData::PositionClosed(PositionClosedData {
                tick,
                fees0: record.accumulated_fees_0,
                fees1: record.accumulated_fees_1,
                value_hold: record.value_hold,
                value_position: record.value_position,
            }),
        ));
        self.performance.push(record);
    }

    /// Drops a claimed index without a performance record.
    pub fn record_discarded(&mut self, index: usize, block: u64) {
        self.claimed.remove(&index);
        self.discarded.push(index);
        let (tick_lower, tick_upper) = self.positions[index].range();
        self.events.push(LifecycleEvent::new(
            Some(index),
            block,
            EventData::PositionDiscarded(PositionDiscardedData {
                tick_lower,
                tick_upper,
                stage: DiscardStage::Close,
            }),
        ));
    }

    /// All positions ever opened, by index.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, index: usize) -> Option<&Position> {
        self.positions.get(index)
    }

    pub fn metadata(&self, index: usize) -> Option<&OpenMetadata> {
        self.metadata.get(index)
    }

    /// Open indices in ascending order.
    pub fn open_indices(&self) -> Vec<usize> {
        self.open.iter().copied().collect()
    }

    /// Closed indices in close order.
    pub fn closed_indices(&self) -> &[usize] {
        &self.closed
    }

    /// Discarded indices in discard order.
    pub fn discarded_indices(&self) -> &[usize] {
        &self.discarded
    }

    /// Performance records in close order.
    pub fn performance(&self) -> &[PerformanceRecord] {
        &self.performance
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Views of every open position.
    pub fn open_positions(&self) -> Vec<OpenPositionView> {
        self.open
            .iter()
            .map(|&index| OpenPositionView {
                index,
                opened_block: self.metadata[index].block,
                lower_tick: self.positions[index].lower_tick(),
                upper_tick: self.positions[index].upper_tick(),
            })
            .collect()
    }

    /// Gets aggregate statistics.
    pub fn aggregate_stats(&self) -> AggregateStats {
        let mut stats = AggregateStats {
            total_positions: self.positions.len() as u32,
            open_positions: (self.open.len() + self.claimed.len()) as u32,
            closed_positions: self.closed.len() as u32,
            discarded: self.discarded.len() as u32 + self.discarded_opens,
            ..AggregateStats::default()
        };

        for record in &self.performance {
            stats.total_fees += record.total_fees();
            stats.total_value_position += record.value_position;
            stats.total_value_hold += record.value_hold;
            stats.net_vs_hold += record.net_vs_hold();
        }

        stats
    }
}
