use crate::error::MathError;
use crate::math::price_tick::price;

/// Value of a range position in token1 at the current tick.
///
/// - below range (all token0): P_c * (1/sqrt(P_l) - 1/sqrt(P_u))
/// - at or above range (all token1): sqrt(P_u) - sqrt(P_l)
/// - inside: 2*sqrt(P_c) - sqrt(P_l) - P_c/sqrt(P_u)
#[must_use]
pub fn value_position(liquidity: f64, tick_lower: i32, tick_upper: i32, tick_current: i32) -> f64 {
    let price_lower = price(f64::from(tick_lower));
    let price_upper = price(f64::from(tick_upper));
    let price_current = price(f64::from(tick_current));

    let value = if tick_current < tick_lower {
        price_current * (1.0 / price_lower.sqrt() - 1.0 / price_upper.sqrt())
    } else if tick_current >= tick_upper {
        price_upper.sqrt() - price_lower.sqrt()
    } else {
        2.0 * price_current.sqrt() - price_lower.sqrt() - price_current / price_upper.sqrt()
    };

    liquidity * value
}

/// Value in token1 of the initial deposit had it been held instead of provided.
///
/// The regime is selected by the tick at which the position was opened, while
/// prices are evaluated at the current tick. Inside the range the held token0
/// is valued at `P_c` and the held token1 was fixed at `P_i`:
/// (P_i + P_c)/sqrt(P_i) - sqrt(P_l) - P_c/sqrt(P_u)
#[must_use]
pub fn value_hold(
    liquidity: f64,
    tick_init: i32,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
) -> f64 {
    let price_lower = price(f64::from(tick_lower));
    let price_upper = price(f64::from(tick_upper));
    let price_current = price(f64::from(tick_current));
    let price_init = price(f64::from(tick_init));

    let value = if tick_init < tick_lower {
        price_current * (1.0 / price_lower.sqrt() - 1.0 / price_upper.sqrt())
    } else if tick_init >= tick_upper {
        price_upper.sqrt() - price_lower.sqrt()
    } else {
        (price_init + price_current) / price_init.sqrt()
            - price_lower.sqrt()
            - price_current / price_upper.sqrt()
    };

    liquidity * value
}

/// Relative gap between providing and holding: `(V_position - V_hold) / V_hold`.
pub fn impermanent_loss(
    liquidity: f64,
    tick_init: i32,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
) -> Result<f64, MathError> {
    let v_position = value_position(liquidity, tick_lower, tick_upper, tick_current);
    let v_hold = value_hold(liquidity, tick_init, tick_lower, tick_upper, tick_current);

    if v_hold == 0.0 {
        return Err(MathError::ZeroHoldValue);
    }

    Ok((v_position - v_hold) / v_hold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::concentrated_liquidity::{amount_x, amount_y};
    use crate::math::price_tick::sqrt_price;

    const L: f64 = 1e12;

    #[test]
    fn test_no_loss_when_price_unchanged() {
        let il = impermanent_loss(L, 50, -600, 600, 50).unwrap();
        assert!(il.abs() < 1e-12);
    }

    #[test]
    fn test_loss_when_price_moves_inside_range() {
        let up = impermanent_loss(L, 0, -600, 600, 400).unwrap();
        let down = impermanent_loss(L, 0, -600, 600, -400).unwrap();
        assert!(up < 0.0);
        assert!(down < 0.0);
    }

    #[test]
    fn test_position_value_matches_token_amounts() {
        let (lower, upper) = (-600, 600);
        for tick in [-900, -600, -1, 0, 333, 599, 600, 1200] {
            let sp = sqrt_price(f64::from(tick));
            let expected = amount_x(L, lower, upper, tick, sp) * price(f64::from(tick))
                + amount_y(L, lower, upper, tick, sp);
            let value = value_position(L, lower, upper, tick);
            assert!((value - expected).abs() / expected < 1e-9, "tick {tick}");
        }
    }

    #[test]
    fn test_hold_regime_follows_initial_tick() {
        // opened above the range: the deposit was all token1 and holds its value
        let held = value_hold(L, 700, -600, 600, -2000);
        let expected = L * (price(600.0).sqrt() - price(-600.0).sqrt());
        assert!((held - expected).abs() / expected < 1e-12);

        // opened below the range: all token0, valued at the current price
        let held = value_hold(L, -700, -600, 600, 300);
        let expected =
            L * price(300.0) * (1.0 / price(-600.0).sqrt() - 1.0 / price(600.0).sqrt());
        assert!((held - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn test_out_of_range_position_equals_hold() {
        // opened and still above the range: no rebalancing happened
        let il = impermanent_loss(L, 900, -600, 600, 800).unwrap();
        assert!(il.abs() < 1e-12);
    }

    #[test]
    fn test_zero_liquidity_has_no_relative_loss() {
        assert_eq!(
            impermanent_loss(0.0, 0, -60, 60, 0),
            Err(MathError::ZeroHoldValue)
        );
    }
}
