use crate::error::MathError;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Price ratio between two adjacent ticks.
pub const TICK_BASE: f64 = 1.0001;

/// Real-valued price at a tick.
/// P = 1.0001 ^ tick
#[must_use]
pub fn price(tick: f64) -> f64 {
    TICK_BASE.powf(tick)
}

/// Real-valued square-root price at a tick.
/// sqrt(P) = 1.0001 ^ (tick / 2)
#[must_use]
pub fn sqrt_price(tick: f64) -> f64 {
    TICK_BASE.powf(tick / 2.0)
}

/// Returns the price corresponding to a given tick.
/// P = 1.0001 ^ tick
pub fn tick_to_price(tick: i32) -> Result<Decimal, MathError> {
    let price_f64 = TICK_BASE.powi(tick);
    Decimal::from_f64(price_f64).ok_or(MathError::DecimalOverflow("price"))
}

/// Returns the tick corresponding to a given price.
/// tick = log_1.0001(P)
pub fn price_to_tick(price: Decimal) -> Result<i32, MathError> {
    if price <= Decimal::ZERO {
        return Err(MathError::NonPositivePrice);
    }
    let price_f64 = price.to_f64().ok_or(MathError::DecimalOverflow("price"))?;
    let tick = price_f64.log(TICK_BASE);
    Ok(tick.round() as i32)
}

/// Rounds a tick down to the nearest multiple of `spacing`.
#[must_use]
pub fn floor_to_spacing(tick: i32, spacing: i32) -> i32 {
    tick.div_euclid(spacing) * spacing
}

/// Rounds a real-valued tick to the nearest multiple of `spacing`.
#[must_use]
pub fn round_to_spacing(tick: f64, spacing: i32) -> i32 {
    let steps = (tick / f64::from(spacing)).round();
    steps as i32 * spacing
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_to_price() {
        // Tick 0 -> Price 1
        let p = tick_to_price(0).unwrap();
        assert_eq!(p, dec!(1));

        // Tick 100 -> 1.0001^100 ~= 1.010049
        let p100 = tick_to_price(100).unwrap();
        let diff = (p100.to_f64().unwrap() - 1.01004966).abs();
        assert!(diff < 0.000001);
    }

    #[test]
    fn test_price_to_tick() {
        assert_eq!(price_to_tick(dec!(1)).unwrap(), 0);
        assert_eq!(price_to_tick(dec!(1.01004966)).unwrap(), 100);
        assert_eq!(price_to_tick(dec!(0)), Err(MathError::NonPositivePrice));
    }

    #[test]
    fn test_price_tick_round_trip_within_spacing() {
        for tick in (-200_000..=200_000).step_by(60) {
            let p = tick_to_price(tick).unwrap();
            let back = price_to_tick(p).unwrap();
            assert!((back - tick).abs() <= 60, "tick {tick} came back as {back}");
        }
    }

    #[test]
    fn test_sqrt_price_squares_to_price() {
        for tick in [-887_272.0, -1000.5, 0.0, 17.0, 204_000.0] {
            let sp = sqrt_price(tick);
            let rel = (sp * sp - price(tick)).abs() / price(tick);
            assert!(rel < 1e-12);
        }
    }

    #[test]
    fn test_floor_to_spacing_negative() {
        assert_eq!(floor_to_spacing(125, 60), 120);
        assert_eq!(floor_to_spacing(-1, 60), -60);
        assert_eq!(floor_to_spacing(-60, 60), -60);
    }

    #[test]
    fn test_round_to_spacing() {
        assert_eq!(round_to_spacing(104.9, 10), 100);
        assert_eq!(round_to_spacing(105.1, 10), 110);
        assert_eq!(round_to_spacing(-31.0, 60), -60);
    }
}
