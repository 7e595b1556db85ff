use super::price_tick::sqrt_price;
use crate::error::MathError;
use crate::value_objects::deposit::Deposit;
use serde::{Deserialize, Serialize};

/// Amount of token0 (x) locked in `[tick_lower, tick_upper)` at the current price.
///
/// - below range: L * (1/sqrt(P_lower) - 1/sqrt(P_upper))
/// - at or above range: 0
/// - inside: L * (1/sqrt(P_current) - 1/sqrt(P_upper))
#[must_use]
pub fn amount_x(
    liquidity: f64,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    sqrt_price_current: f64,
) -> f64 {
    let sqrt_lower = sqrt_price(f64::from(tick_lower));
    let sqrt_upper = sqrt_price(f64::from(tick_upper));

    let value = if tick_current < tick_lower {
        1.0 / sqrt_lower - 1.0 / sqrt_upper
    } else if tick_current >= tick_upper {
        0.0
    } else {
        1.0 / sqrt_price_current - 1.0 / sqrt_upper
    };

    liquidity * value
}

/// Amount of token1 (y) locked in `[tick_lower, tick_upper)` at the current price.
///
/// - below range: 0
/// - at or above range: L * (sqrt(P_upper) - sqrt(P_lower))
/// - inside: L * (sqrt(P_current) - sqrt(P_lower))
#[must_use]
pub fn amount_y(
    liquidity: f64,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    sqrt_price_current: f64,
) -> f64 {
    let sqrt_lower = sqrt_price(f64::from(tick_lower));
    let sqrt_upper = sqrt_price(f64::from(tick_upper));

    let value = if tick_current < tick_lower {
        0.0
    } else if tick_current >= tick_upper {
        sqrt_upper - sqrt_lower
    } else {
        sqrt_price_current - sqrt_lower
    };

    liquidity * value
}

/// Liquidity and real amounts resolved from a one-sided deposit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityQuote {
    /// Liquidity `L` backing the deposit.
    pub liquidity: f64,
    /// Real token0 amount committed to the range.
    pub amount0: f64,
    /// Real token1 amount committed to the range.
    pub amount1: f64,
    /// Square-root price the quote was computed at.
    pub sqrt_price: f64,
}

impl LiquidityQuote {
    /// Virtual token0 reserve, `L / sqrt(P)`.
    #[must_use]
    pub fn x_virtual(&self) -> f64 {
        self.liquidity / self.sqrt_price
    }

    /// Virtual token1 reserve, `L * sqrt(P)`.
    #[must_use]
    pub fn y_virtual(&self) -> f64 {
        self.liquidity * self.sqrt_price
    }
}

/// Solves for liquidity and the complementary real amount given a one-sided deposit.
///
/// Token1 deposit: `L = y / (sqrt(P_current) - sqrt(P_lower))`,
/// `x = L * (sqrt(P_upper) - sqrt(P_current)) / (sqrt(P_upper) * sqrt(P_current))`.
///
/// Token0 deposit: `L = x / (1/sqrt(P_current) - 1/sqrt(P_upper))`,
/// `y = L * (sqrt(P_current) - sqrt(P_lower))`.
pub fn virtual_from_real(
    tick_lower: i32,
    tick_upper: i32,
    sqrt_price_current: f64,
    deposit: Deposit,
) -> Result<LiquidityQuote, MathError> {
    if tick_lower >= tick_upper {
        return Err(MathError::InvalidRange {
            lower: tick_lower,
            upper: tick_upper,
            spacing: 1,
        });
    }
    if !(sqrt_price_current > 0.0) {
        return Err(MathError::NonPositivePrice);
    }

    let sqrt_lower = sqrt_price(f64::from(tick_lower));
    let sqrt_upper = sqrt_price(f64::from(tick_upper));

    let (liquidity, amount0, amount1) = match deposit {
        Deposit::Token1(y_real) => {
            let span = sqrt_price_current - sqrt_lower;
            if span <= 0.0 {
                return Err(MathError::InvalidDeposit(
                    "token1 deposit needs the price above the lower bound",
                ));
            }
            let liquidity = y_real / span;
            let x_real = liquidity * (sqrt_upper - sqrt_price_current)
                / (sqrt_upper * sqrt_price_current);
            (liquidity, x_real, y_real)
        }
        Deposit::Token0(x_real) => {
            let span = 1.0 / sqrt_price_current - 1.0 / sqrt_upper;
            if span <= 0.0 {
                return Err(MathError::InvalidDeposit(
                    "token0 deposit needs the price below the upper bound",
                ));
            }
            let liquidity = x_real / span;
            let y_real = liquidity * (sqrt_price_current - sqrt_lower);
            (liquidity, x_real, y_real)
        }
    };

    if !(liquidity > 0.0) || !liquidity.is_finite() {
        return Err(MathError::InvalidDeposit("deposit must be positive"));
    }

    Ok(LiquidityQuote {
        liquidity,
        amount0,
        amount1,
        sqrt_price: sqrt_price_current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::price_tick::price;

    const L: f64 = 1_000_000.0;

    fn total_in_y(tick_lower: i32, tick_upper: i32, tick: i32) -> f64 {
        let sp = sqrt_price(f64::from(tick));
        amount_x(L, tick_lower, tick_upper, tick, sp) * price(f64::from(tick))
            + amount_y(L, tick_lower, tick_upper, tick, sp)
    }

    #[test]
    fn test_amounts_vanish_at_boundaries() {
        for (lower, upper) in [(-600, 600), (100, 160), (-20_040, -19_980)] {
            let sp_lower = sqrt_price(f64::from(lower));
            let sp_upper = sqrt_price(f64::from(upper));
            assert_eq!(amount_y(L, lower, upper, lower, sp_lower), 0.0);
            assert_eq!(amount_x(L, lower, upper, upper, sp_upper), 0.0);
        }
    }

    #[test]
    fn test_value_continuous_across_boundaries() {
        let (lower, upper) = (-600, 600);

        let below = total_in_y(lower, upper, lower - 1);
        let at_lower = total_in_y(lower, upper, lower);
        assert!((below - at_lower).abs() / at_lower < 1e-3);

        let inside = total_in_y(lower, upper, upper - 1);
        let at_upper = total_in_y(lower, upper, upper);
        assert!((inside - at_upper).abs() / at_upper < 1e-3);
    }

    #[test]
    fn test_below_range_is_all_token0() {
        let sp = sqrt_price(-1000.0);
        assert!(amount_x(L, -600, 600, -1000, sp) > 0.0);
        assert_eq!(amount_y(L, -600, 600, -1000, sp), 0.0);
    }

    #[test]
    fn test_token1_deposit_round_trips_through_amount_y() {
        let (lower, upper, tick) = (-600, 600, 37);
        let sp = sqrt_price(f64::from(tick));
        let y_real = 1e18;

        let quote = virtual_from_real(lower, upper, sp, Deposit::Token1(y_real)).unwrap();
        let y_back = amount_y(quote.liquidity, lower, upper, tick, sp);
        assert!((y_back - y_real).abs() / y_real < 1e-12);

        let x_back = amount_x(quote.liquidity, lower, upper, tick, sp);
        assert!((x_back - quote.amount0).abs() / quote.amount0 < 1e-12);
    }

    #[test]
    fn test_token0_deposit_round_trips_through_amount_x() {
        let (lower, upper, tick) = (-600, 600, -250);
        let sp = sqrt_price(f64::from(tick));
        let x_real = 5e17;

        let quote = virtual_from_real(lower, upper, sp, Deposit::Token0(x_real)).unwrap();
        let x_back = amount_x(quote.liquidity, lower, upper, tick, sp);
        assert!((x_back - x_real).abs() / x_real < 1e-12);

        let y_back = amount_y(quote.liquidity, lower, upper, tick, sp);
        assert!((y_back - quote.amount1).abs() / quote.amount1 < 1e-12);
    }

    #[test]
    fn test_virtual_reserves_recover_liquidity() {
        let sp = sqrt_price(10.0);
        let quote = virtual_from_real(-600, 600, sp, Deposit::Token1(1e18)).unwrap();
        let l = (quote.x_virtual() * quote.y_virtual()).sqrt();
        assert!((l - quote.liquidity).abs() / quote.liquidity < 1e-12);
    }

    #[test]
    fn test_token1_deposit_below_range_rejected() {
        let sp = sqrt_price(-1000.0);
        let err = virtual_from_real(-600, 600, sp, Deposit::Token1(1e18)).unwrap_err();
        assert!(matches!(err, MathError::InvalidDeposit(_)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = virtual_from_real(600, -600, 1.0, Deposit::Token1(1.0)).unwrap_err();
        assert!(matches!(err, MathError::InvalidRange { .. }));
    }
}
