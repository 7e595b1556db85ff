use crate::error::MathError;
use crate::math::concentrated_liquidity::{amount_x, amount_y};
use crate::math::fee_growth::FeeGrowth;
use crate::math::price_tick::sqrt_price;
use crate::metrics::fees::{AccruedFees, accumulated_fees};
use crate::metrics::valuation::{impermanent_loss, value_hold, value_position};
use crate::value_objects::tick_range::TickRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A liquidity position over `[lower_tick, upper_tick)`.
///
/// Everything except `external_id` is fixed at open time; the external id is
/// bound once a live mint succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    init_tick: i32,
    lower_tick: i32,
    upper_tick: i32,
    liquidity: f64,
    fee_growth_inside_last: FeeGrowth,
    external_id: Option<String>,
}

impl Position {
    pub fn new(
        init_tick: i32,
        range: TickRange,
        liquidity: f64,
        fee_growth_inside_last: FeeGrowth,
    ) -> Self {
        Self {
            init_tick,
            lower_tick: range.lower(),
            upper_tick: range.upper(),
            liquidity,
            fee_growth_inside_last,
            external_id: None,
        }
    }

    /// Tick at open.
    pub fn init_tick(&self) -> i32 {
        self.init_tick
    }

    pub fn lower_tick(&self) -> i32 {
        self.lower_tick
    }

    pub fn upper_tick(&self) -> i32 {
        self.upper_tick
    }

    pub fn range(&self) -> (i32, i32) {
        (self.lower_tick, self.upper_tick)
    }

    /// Virtual liquidity minted at open.
    pub fn liquidity(&self) -> f64 {
        self.liquidity
    }

    /// Fee growth inside the range recorded at open.
    pub fn fee_growth_inside_last(&self) -> FeeGrowth {
        self.fee_growth_inside_last
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// Binds the identifier returned by a live mint. Returns `false` if one was already bound.
    pub fn bind_external_id(&mut self, id: impl Into<String>) -> bool {
        if self.external_id.is_some() {
            return false;
        }
        self.external_id = Some(id.into());
        true
    }

    pub fn is_in_range(&self, tick: i32) -> bool {
        tick >= self.lower_tick && tick < self.upper_tick
    }

    /// Token0 held by the position. Uses the exact square-root price when known.
    pub fn amount_x(&self, tick: i32, sqrt_price_current: Option<f64>) -> f64 {
        let sp = sqrt_price_current.unwrap_or_else(|| sqrt_price(f64::from(tick)));
        amount_x(self.liquidity, self.lower_tick, self.upper_tick, tick, sp)
    }

    /// Token1 held by the position. Uses the exact square-root price when known.
    pub fn amount_y(&self, tick: i32, sqrt_price_current: Option<f64>) -> f64 {
        let sp = sqrt_price_current.unwrap_or_else(|| sqrt_price(f64::from(tick)));
        amount_y(self.liquidity, self.lower_tick, self.upper_tick, tick, sp)
    }

    pub fn value_position(&self, tick: i32) -> f64 {
        value_position(self.liquidity, self.lower_tick, self.upper_tick, tick)
    }

    pub fn value_hold(&self, tick: i32) -> f64 {
        value_hold(
            self.liquidity,
            self.init_tick,
            self.lower_tick,
            self.upper_tick,
            tick,
        )
    }

    pub fn impermanent_loss(&self, tick: i32) -> Result<f64, MathError> {
        impermanent_loss(
            self.liquidity,
            self.init_tick,
            self.lower_tick,
            self.upper_tick,
            tick,
        )
    }

    /// Fees accrued since open, given the fee growth inside the range now.
    pub fn accumulated_fees(&self, tick: i32, inside_now: FeeGrowth) -> AccruedFees {
        accumulated_fees(self.liquidity, inside_now, self.fee_growth_inside_last, tick)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) init {} L {:.4e}",
            self.lower_tick, self.upper_tick, self.init_tick, self.liquidity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position() -> Position {
        let range = TickRange::new(-600, 600, 60).unwrap();
        Position::new(0, range, 1e12, FeeGrowth::new(1.0, 2.0))
    }

    #[test]
    fn test_external_id_binds_once() {
        let mut p = position();
        assert!(p.external_id().is_none());
        assert!(p.bind_external_id("42"));
        assert!(!p.bind_external_id("43"));
        assert_eq!(p.external_id(), Some("42"));
    }

    #[test]
    fn test_fields_fixed_at_open() {
        let p = position();
        assert_eq!(p.init_tick(), 0);
        assert_eq!(p.range(), (p.lower_tick(), p.upper_tick()));
        assert_eq!(p.range(), (-600, 600));
        assert_eq!(p.liquidity(), 1e12);
        assert_eq!(p.fee_growth_inside_last(), FeeGrowth::new(1.0, 2.0));
    }

    #[test]
    fn test_fees_relative_to_open_checkpoint() {
        let p = position();
        let fees = p.accumulated_fees(0, FeeGrowth::new(1.5, 2.0));
        assert_eq!(fees.token0, 0.5e12);
        assert_eq!(fees.token1, 0.0);
    }

    #[test]
    fn test_in_range_is_half_open() {
        let p = position();
        assert!(p.is_in_range(-600));
        assert!(p.is_in_range(599));
        assert!(!p.is_in_range(600));
    }
}
