use crate::error::MathError;
use crate::math::price_tick::round_to_spacing;
use serde::{Deserialize, Serialize};

/// A validated `[lower, upper)` tick range aligned to the pool spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickRange {
    lower: i32,
    upper: i32,
}

impl TickRange {
    pub fn new(lower: i32, upper: i32, spacing: i32) -> Result<Self, MathError> {
        let aligned = spacing > 0 && lower % spacing == 0 && upper % spacing == 0;
        if lower >= upper || !aligned {
            return Err(MathError::InvalidRange {
                lower,
                upper,
                spacing,
            });
        }
        Ok(Self { lower, upper })
    }

    /// Range spanning `center ± half_width`, each bound rounded to the nearest
    /// spacing multiple and kept at least one spacing away from the rounded centre.
    pub fn around(center: f64, half_width: f64, spacing: i32) -> Result<Self, MathError> {
        let mid = round_to_spacing(center, spacing);
        let lower = round_to_spacing(center - half_width, spacing).min(mid - spacing);
        let upper = round_to_spacing(center + half_width, spacing).max(mid + spacing);
        Self::new(lower, upper, spacing)
    }

    pub fn lower(&self) -> i32 {
        self.lower
    }

    pub fn upper(&self) -> i32 {
        self.upper
    }

    pub fn width(&self) -> i32 {
        self.upper - self.lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unaligned_or_inverted() {
        assert!(TickRange::new(-60, 60, 60).is_ok());
        assert!(TickRange::new(-50, 60, 60).is_err());
        assert!(TickRange::new(60, 60, 60).is_err());
        assert!(TickRange::new(120, 60, 60).is_err());
        assert!(TickRange::new(0, 60, 0).is_err());
    }

    #[test]
    fn test_around_is_symmetric_on_aligned_centre() {
        let range = TickRange::around(100.0, 23.2, 10).unwrap();
        assert_eq!((range.lower(), range.upper()), (80, 120));
    }

    #[test]
    fn test_around_keeps_minimum_width() {
        let range = TickRange::around(100.0, 0.0, 10).unwrap();
        assert_eq!((range.lower(), range.upper()), (90, 110));
    }
}
