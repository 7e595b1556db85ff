//! Position lifecycle.
//!
//! Opening and closing positions against the synchronized pool, the ledger
//! of open, closed and discarded positions, and the events they emit.

mod events;
mod ledger;
mod manager;

pub use events::*;
pub use ledger::*;
pub use manager::*;
