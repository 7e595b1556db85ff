//! Prelude module for convenient imports.
//!
//! ```rust
//! use v3lp_protocols::prelude::*;
//! ```

pub use crate::chain::{BurnReceipt, ChainClient, ChainHead, MintReceipt};
pub use crate::error::ChainError;
pub use crate::replay::{EventLog, ReplayChainClient};
pub use crate::simulated::SimulatedChain;
