//! Tick, price and liquidity math.

pub mod concentrated_liquidity;
pub mod fee_growth;
pub mod price_tick;

pub use concentrated_liquidity::{LiquidityQuote, amount_x, amount_y, virtual_from_real};
pub use fee_growth::{FeeGrowth, FeeGrowthX128, fee_growth_above, fee_growth_below, fee_growth_inside};
pub use price_tick::{
    floor_to_spacing, price, price_to_tick, round_to_spacing, sqrt_price, tick_to_price,
};
