//! Replay of recorded pool events.
//!
//! Recordings are comma-delimited, one file per event kind:
//! - swaps: `block, tick, liquidity, sqrt_price_x96, amount0, amount1`
//! - mints and burns: `block, tick_lower, tick_upper, amount0, amount1`

mod client;
mod records;

pub use client::*;
pub use records::*;
