//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use v3lp_execution::prelude::*;
//! ```

// Config
pub use crate::config::{EngineConfig, RunMode, StrategyConfig, SyncConfig};

// Engine
pub use crate::engine::{Engine, EngineReport};

// Errors
pub use crate::error::ExecutionError;

// Lifecycle
pub use crate::lifecycle::{
    AggregateStats, CloseOutcome, DiscardStage, EventData, LifecycleEvent, LifecycleEventType,
    OpenMetadata, OpenOutcome, OpenPositionView, PositionCommands, PositionLedger,
    PositionManager,
};

// Strategy
pub use crate::strategy::{
    CycleReport, Decision, SchedulerExit, SchedulerHandle, StrategyContext, StrategyPolicy,
    StrategyScheduler, VolatilityBandPolicy,
};

// Sync
pub use crate::sync::{
    BlockAdvance, BoundedHistory, CacheRefresher, ProtocolSnapshot, ProtocolSynchronizer,
    RefreshHandle, SharedPoolState, StepOutcome, SyncExit, SyncHandle, TickRangeCache,
};
