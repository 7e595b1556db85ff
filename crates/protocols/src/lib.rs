//! Chain access for a single concentrated-liquidity pool.
//!
//! This crate defines the contract the engine consumes:
//! - [`ChainClient`](chain::ChainClient): block head, pool events, tick and fee state, mint/burn
//! - Replay of recorded event logs for backtests
//! - An in-process simulated chain for paper trading and tests

/// Prelude module for convenient imports.
pub mod prelude;

/// Chain client contract.
pub mod chain;
/// Chain errors.
pub mod error;
/// Recorded event replay.
pub mod replay;
/// In-process simulated chain.
pub mod simulated;
