use crate::math::fee_growth::{FeeGrowth, FeeGrowthX128};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// On-chain state of a single initialized tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickState {
    /// Net liquidity added when the tick is crossed left to right.
    pub liquidity_net: i128,
    /// Raw Q128.128 token0 fee growth on the other side of this tick.
    pub fee_growth_outside_0_x128: U256,
    /// Raw Q128.128 token1 fee growth on the other side of this tick.
    pub fee_growth_outside_1_x128: U256,
    pub initialized: bool,
}

impl TickState {
    pub fn new(
        liquidity_net: i128,
        fee_growth_outside_0_x128: U256,
        fee_growth_outside_1_x128: U256,
    ) -> Self {
        Self {
            liquidity_net,
            fee_growth_outside_0_x128,
            fee_growth_outside_1_x128,
            initialized: true,
        }
    }

    /// Normalized fee growth outside this tick.
    pub fn fee_growth_outside(&self) -> FeeGrowth {
        FeeGrowth::from_x128(FeeGrowthX128::new(
            self.fee_growth_outside_0_x128,
            self.fee_growth_outside_1_x128,
        ))
    }
}
