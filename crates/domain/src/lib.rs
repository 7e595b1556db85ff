//! Domain model and valuation math for concentrated-liquidity positions.
//!
//! Everything in this crate is pure: tick/price conversions, token amounts
//! locked in a range, position and hold valuation, and fee-growth accounting.
//! Stateful synchronization lives in `v3lp-execution`.

/// Prelude module for convenient imports.
pub mod prelude;

/// Pool entities: ticks, events and positions.
pub mod entities;
/// Domain errors.
pub mod error;
/// Tick, price and liquidity math.
pub mod math;
/// Position valuation and fee metrics.
pub mod metrics;
/// Small value types shared across crates.
pub mod value_objects;
