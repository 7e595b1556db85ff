//! Policy contract between the scheduler and a decision rule.

use crate::lifecycle::OpenPositionView;
use crate::sync::ProtocolSnapshot;
use serde::{Deserialize, Serialize};
use v3lp_domain::value_objects::{Deposit, TickRange};

/// Everything a policy sees on one cycle.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    /// Latest ingested block.
    pub current_block: u64,
    /// Latest pool tick.
    pub current_tick: i32,
    /// Pool tick spacing.
    pub tick_spacing: i32,
    /// Pool state at the start of the cycle.
    pub snapshot: ProtocolSnapshot,
    /// Positions open at the start of the cycle.
    pub open_positions: Vec<OpenPositionView>,
}

/// An action requested by a policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Close the open position at `index`.
    Close {
        /// Ledger index.
        index: usize,
    },
    /// Open a new position.
    Open {
        /// Range to provide liquidity over.
        range: TickRange,
        /// Amount committed.
        deposit: Deposit,
    },
}

/// Decides what to open and close on each scheduler cycle.
///
/// The scheduler applies every close before any open.
pub trait StrategyPolicy: Send + Sync {
    /// Decisions for the state in `ctx`; empty when there is nothing to do.
    fn decide(&self, ctx: &StrategyContext) -> Vec<Decision>;
}

impl<P: StrategyPolicy + ?Sized> StrategyPolicy for Box<P> {
    fn decide(&self, ctx: &StrategyContext) -> Vec<Decision> {
        (**self).decide(ctx)
    }
}
