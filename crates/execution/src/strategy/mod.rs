//! Strategy decisions and the scheduler that applies them.
//!
//! - [`StrategyPolicy`]: turns a pool snapshot into open/close decisions
//! - [`VolatilityBandPolicy`]: the bundled hold-limit plus volatility-band policy
//! - [`StrategyScheduler`]: the periodic loop driving a policy against the position manager

mod policy;
mod scheduler;
mod volatility;

pub use policy::*;
pub use scheduler::*;
pub use volatility::*;
