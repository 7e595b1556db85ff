//! Position valuation and fee metrics, denominated in token1.

pub mod fees;
pub mod valuation;

pub use fees::{AccruedFees, accumulated_fees};
pub use valuation::{impermanent_loss, value_hold, value_position};
