use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// Raw Q128.128 fee-growth accumulators as stored on-chain, one per token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeGrowthX128 {
    /// Token0 accumulator.
    pub token0: U256,
    /// Token1 accumulator.
    pub token1: U256,
}

impl FeeGrowthX128 {
    /// Creates a raw accumulator pair.
    #[must_use]
    pub fn new(token0: U256, token1: U256) -> Self {
        Self { token0, token1 }
    }
}

/// Fee growth per unit of liquidity, normalized to real values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeGrowth {
    /// Token0 fee growth.
    pub token0: f64,
    /// Token1 fee growth.
    pub token1: f64,
}

impl FeeGrowth {
    /// Creates a normalized fee-growth pair.
    #[must_use]
    pub fn new(token0: f64, token1: f64) -> Self {
        Self { token0, token1 }
    }

    /// Normalizes raw on-chain accumulators by dividing by 2^128.
    #[must_use]
    pub fn from_x128(raw: FeeGrowthX128) -> Self {
        Self {
            token0: x128_to_f64(raw.token0),
            token1: x128_to_f64(raw.token1),
        }
    }

    /// Fee growth inside `[tick_lower, tick_upper)` for both tokens.
    #[must_use]
    pub fn inside(
        tick_lower: i32,
        tick_upper: i32,
        tick_current: i32,
        outside_lower: FeeGrowth,
        outside_upper: FeeGrowth,
        global: FeeGrowth,
    ) -> Self {
        Self {
            token0: fee_growth_inside(
                tick_lower,
                tick_upper,
                tick_current,
                outside_lower.token0,
                outside_upper.token0,
                global.token0,
            ),
            token1: fee_growth_inside(
                tick_lower,
                tick_upper,
                tick_current,
                outside_lower.token1,
                outside_upper.token1,
                global.token1,
            ),
        }
    }
}

impl Sub for FeeGrowth {
    type Output = FeeGrowth;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            token0: self.token0 - rhs.token0,
            token1: self.token1 - rhs.token1,
        }
    }
}

/// Converts a Q128.128 fixed-point value into `f64`.
#[must_use]
pub fn x128_to_f64(value: U256) -> f64 {
    // limbs are little-endian 64-bit words
    let whole = value
        .0
        .iter()
        .rev()
        .fold(0.0_f64, |acc, limb| acc * 2f64.powi(64) + *limb as f64);
    whole / 2f64.powi(128)
}

/// Fee growth accrued below `tick_lower`.
#[must_use]
pub fn fee_growth_below(tick_lower: i32, tick_current: i32, outside: f64, global: f64) -> f64 {
    if tick_current >= tick_lower {
        outside
    } else {
        global - outside
    }
}

/// Fee growth accrued above `tick_upper`.
#[must_use]
pub fn fee_growth_above(tick_upper: i32, tick_current: i32, outside: f64, global: f64) -> f64 {
    if tick_current >= tick_upper {
        global - outside
    } else {
        outside
    }
}

/// Fee growth accrued inside `[tick_lower, tick_upper)` for one token.
/// inside = global - below - above
#[must_use]
pub fn fee_growth_inside(
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    outside_lower: f64,
    outside_upper: f64,
    global: f64,
) -> f64 {
    let below = fee_growth_below(tick_lower, tick_current, outside_lower, global);
    let above = fee_growth_above(tick_upper, tick_current, outside_upper, global);
    global - below - above
}
