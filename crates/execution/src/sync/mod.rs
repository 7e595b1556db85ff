//! Protocol state synchronization.
//!
//! - Bounded event histories and the shared pool view
//! - Tick-range cache with a single refresh worker
//! - The block-by-block synchronizer loop

mod cache;
mod history;
mod state;
mod synchronizer;

pub use cache::*;
pub use history::*;
pub use state::*;
pub use synchronizer::*;
