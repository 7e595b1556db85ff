use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blocks strictly after `after`, up to and including `through`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRange {
    pub after: u64,
    pub through: u64,
}

impl BlockRange {
    pub fn new(after: u64, through: u64) -> Self {
        Self { after, through }
    }

    pub fn contains(&self, block: u64) -> bool {
        block > self.after && block <= self.through
    }

    pub fn is_empty(&self) -> bool {
        self.through <= self.after
    }

    /// Iterates the blocks covered by the range.
    pub fn blocks(&self) -> impl Iterator<Item = u64> {
        (self.after + 1)..=self.through
    }
}

/// A pool swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    pub block: u64,
    /// Pool tick after the swap.
    pub tick: i32,
    /// In-range liquidity after the swap.
    pub liquidity: u128,
    /// Q64.96 square-root price after the swap.
    pub sqrt_price_x96: U256,
    pub amount0: i128,
    pub amount1: i128,
}

/// Whether liquidity was added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiquidityEventKind {
    Mint,
    Burn,
}

impl fmt::Display for LiquidityEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidityEventKind::Mint => write!(f, "Mint"),
            LiquidityEventKind::Burn => write!(f, "Burn"),
        }
    }
}

/// A pool mint or burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityEvent {
    pub block: u64,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub amount0: u128,
    pub amount1: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_range_is_left_open() {
        let range = BlockRange::new(10, 12);
        assert!(!range.contains(10));
        assert!(range.contains(11));
        assert!(range.contains(12));
        assert_eq!(range.blocks().collect::<Vec<_>>(), vec![11, 12]);
        assert!(BlockRange::new(12, 12).is_empty());
    }
}
