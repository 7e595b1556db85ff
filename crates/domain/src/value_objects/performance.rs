use crate::metrics::fees::AccruedFees;
use serde::{Deserialize, Serialize};

/// Realized outcome of a closed position, all values in token1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Index of the position this record belongs to.
    pub position_index: usize,
    /// Block at which the position was closed.
    pub closed_at_block: u64,
    pub accumulated_fees_0: f64,
    pub accumulated_fees_1: f64,
    pub value_hold: f64,
    pub value_position: f64,
}

impl PerformanceRecord {
    pub fn new(
        position_index: usize,
        closed_at_block: u64,
        fees: AccruedFees,
        value_hold: f64,
        value_position: f64,
    ) -> Self {
        Self {
            position_index,
            closed_at_block,
            accumulated_fees_0: fees.token0,
            accumulated_fees_1: fees.token1,
            value_hold,
            value_position,
        }
    }

    pub fn total_fees(&self) -> f64 {
        self.accumulated_fees_0 + self.accumulated_fees_1
    }

    /// `(value_position - value_hold) / value_hold`, or `None` for an empty hold.
    pub fn impermanent_loss(&self) -> Option<f64> {
        (self.value_hold != 0.0).then(|| (self.value_position - self.value_hold) / self.value_hold)
    }

    /// Position value plus fees, minus what holding would have been worth.
    pub fn net_vs_hold(&self) -> f64 {
        self.value_position + self.total_fees() - self.value_hold
    }
}
