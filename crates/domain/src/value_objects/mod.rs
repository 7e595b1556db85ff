pub mod deposit;
pub mod performance;
pub mod tick_range;

pub use deposit::Deposit;
pub use performance::PerformanceRecord;
pub use tick_range::TickRange;
