pub mod event;
pub mod position;
pub mod tick;

// Re-export for easier access
pub use event::{BlockRange, LiquidityEvent, LiquidityEventKind, SwapEvent};
pub use position::Position;
pub use tick::TickState;
