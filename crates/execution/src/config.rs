//! Engine configuration.
//!
//! All cadences are explicit settings keyed by [`RunMode`]; nothing in the
//! loops branches on the mode to pick a delay.

use crate::error::ExecutionError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use v3lp_domain::value_objects::Deposit;

/// How the engine is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Recorded events, fast deterministic cadence, no trades.
    #[default]
    Replay,
    /// Live data, block-time cadence, no trades.
    Simulation,
    /// Live data with mints and burns submitted on-chain.
    Live,
}

impl RunMode {
    /// Whether positions over uninitialized ticks are dropped silently.
    #[must_use]
    pub fn discards_uninitialized(self) -> bool {
        !matches!(self, RunMode::Live)
    }

    /// Whether mints and burns are sent to the chain.
    #[must_use]
    pub fn submits_trades(self) -> bool {
        matches!(self, RunMode::Live)
    }
}

/// Configuration for the protocol state synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum entries kept per event history.
    pub max_history_len: usize,
    /// Half-width of the cached tick window, in ticks.
    pub cache_radius: i32,
    /// Delay between advances when replaying, in milliseconds.
    pub replay_poll_ms: u64,
    /// Delay between advances on a live chain, in milliseconds.
    pub live_poll_ms: u64,
    /// Wait before re-querying an unchanged block head, in milliseconds.
    pub block_wait_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_history_len: 5000,
            cache_radius: 100,
            replay_poll_ms: 200,
            live_poll_ms: 1000,
            block_wait_ms: 12_000,
        }
    }
}

impl SyncConfig {
    /// Sets the maximum history length.
    #[must_use]
    pub fn with_max_history_len(mut self, len: usize) -> Self {
        self.max_history_len = len;
        self
    }

    /// Sets the cache radius.
    #[must_use]
    pub fn with_cache_radius(mut self, radius: i32) -> Self {
        self.cache_radius = radius;
        self
    }

    /// Sets the replay poll delay.
    #[must_use]
    pub fn with_replay_poll_ms(mut self, ms: u64) -> Self {
        self.replay_poll_ms = ms;
        self
    }

    /// Sets the live poll delay.
    #[must_use]
    pub fn with_live_poll_ms(mut self, ms: u64) -> Self {
        self.live_poll_ms = ms;
        self
    }

    /// Sets the unchanged-head wait.
    #[must_use]
    pub fn with_block_wait_ms(mut self, ms: u64) -> Self {
        self.block_wait_ms = ms;
        self
    }

    /// Delay after each advance in `mode`.
    #[must_use]
    pub fn poll_delay(&self, mode: RunMode) -> Duration {
        match mode {
            RunMode::Replay => Duration::from_millis(self.replay_poll_ms),
            RunMode::Simulation | RunMode::Live => Duration::from_millis(self.live_poll_ms),
        }
    }

    /// Wait while the head has not moved.
    #[must_use]
    pub fn block_wait(&self) -> Duration {
        Duration::from_millis(self.block_wait_ms)
    }

    /// Checks the values are usable.
    ///
    /// # Errors
    /// Returns `Config` naming the first offending field.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.max_history_len == 0 {
            return Err(ExecutionError::Config(
                "max_history_len must be positive".to_string(),
            ));
        }
        if self.cache_radius < 0 {
            return Err(ExecutionError::Config(
                "cache_radius must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the strategy scheduler and its bundled policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Blocks a position is held before it is closed.
    pub max_hold_blocks: u64,
    /// Blocks per downsampling bucket.
    pub bucket_blocks: u64,
    /// Trailing buckets the volatility is measured over.
    pub volatility_window: usize,
    /// Highest tick-change standard deviation at which a range is opened.
    pub volatility_threshold: f64,
    /// Buckets the per-bucket deviation is extrapolated to when sizing a range.
    pub horizon_buckets: u32,
    /// Amount committed to each new range.
    pub deposit: Deposit,
    /// Cycle delay on a live chain, in milliseconds.
    pub live_cycle_ms: u64,
    /// Cycle delay when replaying, in milliseconds.
    pub replay_cycle_ms: u64,
    /// Extra pause after a cycle with no decision, in milliseconds.
    pub idle_backoff_ms: u64,
    /// Poll period while waiting for the first tick, in milliseconds.
    pub first_tick_poll_ms: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            max_hold_blocks: 300,
            bucket_blocks: 5,
            volatility_window: 120,
            volatility_threshold: 10.0,
            horizon_buckets: 60,
            deposit: Deposit::default(),
            live_cycle_ms: 60_000,
            replay_cycle_ms: 0,
            idle_backoff_ms: 2000,
            first_tick_poll_ms: 10_000,
        }
    }
}

impl StrategyConfig {
    /// Sets the holding duration.
    #[must_use]
    pub fn with_max_hold_blocks(mut self, blocks: u64) -> Self {
        self.max_hold_blocks = blocks;
        self
    }

    /// Sets the bucket size.
    #[must_use]
    pub fn with_bucket_blocks(mut self, blocks: u64) -> Self {
        self.bucket_blocks = blocks;
        self
    }

    /// Sets the volatility window.
    #[must_use]
    pub fn with_volatility_window(mut self, buckets: usize) -> Self {
        self.volatility_window = buckets;
        self
    }

    /// Sets the volatility threshold.
    #[must_use]
    pub fn with_volatility_threshold(mut self, threshold: f64) -> Self {
        self.volatility_threshold = threshold;
        self
    }

    /// Sets the extrapolation horizon.
    #[must_use]
    pub fn with_horizon_buckets(mut self, buckets: u32) -> Self {
        self.horizon_buckets = buckets;
        self
    }

    /// Sets the deposit per range.
    #[must_use]
    pub fn with_deposit(mut self, deposit: Deposit) -> Self {
        self.deposit = deposit;
        self
    }

    /// Sets the live cycle delay.
    #[must_use]
    pub fn with_live_cycle_ms(mut self, ms: u64) -> Self {
        self.live_cycle_ms = ms;
        self
    }

    /// Sets the replay cycle delay.
    #[must_use]
    pub fn with_replay_cycle_ms(mut self, ms: u64) -> Self {
        self.replay_cycle_ms = ms;
        self
    }

    /// Sets the idle backoff.
    #[must_use]
    pub fn with_idle_backoff_ms(mut self, ms: u64) -> Self {
        self.idle_backoff_ms = ms;
        self
    }

    /// Sets the first-tick poll period.
    #[must_use]
    pub fn with_first_tick_poll_ms(mut self, ms: u64) -> Self {
        self.first_tick_poll_ms = ms;
        self
    }

    /// Delay between cycles in `mode`.
    #[must_use]
    pub fn cycle_delay(&self, mode: RunMode) -> Duration {
        match mode {
            RunMode::Replay => Duration::from_millis(self.replay_cycle_ms),
            RunMode::Simulation | RunMode::Live => Duration::from_millis(self.live_cycle_ms),
        }
    }

    /// Pause after an idle cycle.
    #[must_use]
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Poll period while no tick has been observed.
    #[must_use]
    pub fn first_tick_poll(&self) -> Duration {
        Duration::from_millis(self.first_tick_poll_ms)
    }

    /// Checks the values are usable.
    ///
    /// # Errors
    /// Returns `Config` naming the first offending field.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.bucket_blocks == 0 {
            return Err(ExecutionError::Config(
                "bucket_blocks must be positive".to_string(),
            ));
        }
        if self.volatility_window < 2 {
            return Err(ExecutionError::Config(
                "volatility_window must cover at least two buckets".to_string(),
            ));
        }
        if !(self.deposit.amount() > 0.0) {
            return Err(ExecutionError::Config(
                "deposit amount must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run mode.
    pub mode: RunMode,
    /// Synchronizer settings.
    pub sync: SyncConfig,
    /// Scheduler settings.
    pub strategy: StrategyConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    /// Returns `Config` if the document does not parse or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ExecutionError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ExecutionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ExecutionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Validates both sections.
    ///
    /// # Errors
    /// Returns `Config` naming the first offending field.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        self.sync.validate()?;
        self.strategy.validate()
    }
}
