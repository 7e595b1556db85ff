//! Pool synchronization and position execution.
//!
//! This crate runs a single concentrated-liquidity pool against a strategy:
//! - Block-by-block synchronization of pool events into bounded histories
//! - A tick-range cache kept fresh by a single background worker
//! - Opening and closing positions with fee and hold-value accounting
//! - A periodic scheduler applying a pluggable open/close policy
//! - Replay, simulation and live run modes

/// Prelude module for convenient imports.
pub mod prelude;

/// Engine configuration.
pub mod config;
/// Wiring of all components.
pub mod engine;
/// Execution errors.
pub mod error;
/// Position lifecycle management.
pub mod lifecycle;
/// Strategy policy and scheduler.
pub mod strategy;
/// Protocol state synchronization.
pub mod sync;
