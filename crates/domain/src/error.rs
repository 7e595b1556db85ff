use thiserror::Error;

/// Errors raised by the valuation math.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    /// Range bounds are inverted, equal, or not aligned to the spacing.
    #[error("invalid tick range [{lower}, {upper}] for spacing {spacing}")]
    InvalidRange {
        /// Lower tick.
        lower: i32,
        /// Upper tick.
        upper: i32,
        /// Pool tick spacing.
        spacing: i32,
    },
    /// A one-sided deposit cannot be placed at the current price.
    #[error("deposit cannot be placed: {0}")]
    InvalidDeposit(&'static str),
    /// Price must be strictly positive.
    #[error("price must be positive")]
    NonPositivePrice,
    /// Conversion into `Decimal` overflowed.
    #[error("overflow converting {0} to decimal")]
    DecimalOverflow(&'static str),
    /// Hold value is zero, so relative metrics are undefined.
    #[error("hold value is zero")]
    ZeroHoldValue,
}
