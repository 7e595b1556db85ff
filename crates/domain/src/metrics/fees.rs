use crate::math::fee_growth::FeeGrowth;
use crate::math::price_tick::price;
use serde::{Deserialize, Serialize};

/// Fees accrued by a position, both legs denominated in token1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccruedFees {
    /// Token0 fees converted at the current price.
    pub token0: f64,
    /// Token1 fees.
    pub token1: f64,
}

impl AccruedFees {
    /// Sum of both legs in token1.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.token0 + self.token1
    }
}

/// Fees accrued since the last checkpoint of fee growth inside the range.
///
/// Inputs are normalized fee growth (raw on-chain values divided by 2^128).
/// fees_0 = L * (inside_0_now - inside_0_last) * P_c
/// fees_1 = L * (inside_1_now - inside_1_last)
#[must_use]
pub fn accumulated_fees(
    liquidity: f64,
    inside_now: FeeGrowth,
    inside_last: FeeGrowth,
    tick_current: i32,
) -> AccruedFees {
    let delta = inside_now - inside_last;
    AccruedFees {
        token0: liquidity * delta.token0 * price(f64::from(tick_current)),
        token1: liquidity * delta.token1,
    }
}
