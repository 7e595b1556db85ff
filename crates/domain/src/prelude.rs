//! Prelude module for convenient imports.
//!
//! ```rust
//! use v3lp_domain::prelude::*;
//! ```

pub use crate::entities::{
    BlockRange, LiquidityEvent, LiquidityEventKind, Position, SwapEvent, TickState,
};
pub use crate::error::MathError;
pub use crate::math::{
    FeeGrowth, FeeGrowthX128, LiquidityQuote, amount_x, amount_y, fee_growth_inside,
    floor_to_spacing, price, price_to_tick, round_to_spacing, sqrt_price, tick_to_price,
    virtual_from_real,
};
pub use crate::metrics::{
    AccruedFees, accumulated_fees, impermanent_loss, value_hold, value_position,
};
pub use crate::value_objects::{Deposit, PerformanceRecord, TickRange};
