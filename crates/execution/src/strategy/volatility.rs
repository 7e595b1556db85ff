//! Hold-limit and volatility-band policy.

use super::{Decision, StrategyContext, StrategyPolicy};
use crate::config::StrategyConfig;
use tracing::{debug, warn};
use v3lp_domain::entities::SwapEvent;
use v3lp_domain::value_objects::TickRange;

/// Last swap tick of each `bucket_blocks`-sized block bucket, oldest first.
///
/// Swaps must be in block order, as the synchronizer stores them.
pub fn downsample(swaps: &[SwapEvent], bucket_blocks: u64) -> Vec<i32> {
    let bucket_blocks = bucket_blocks.max(1);
    let mut ticks: Vec<i32> = Vec::new();
    let mut current: Option<u64> = None;
    for swap in swaps {
        let bucket = swap.block / bucket_blocks;
        match (current, ticks.last_mut()) {
            (Some(b), Some(last)) if b == bucket => *last = swap.tick,
            _ => {
                ticks.push(swap.tick);
                current = Some(bucket);
            }
        }
    }
    ticks
}

/// Population standard deviation of successive tick changes.
///
/// Returns `None` for fewer than two ticks.
pub fn tick_change_std(ticks: &[i32]) -> Option<f64> {
    if ticks.len() < 2 {
        return None;
    }
    let changes: Vec<f64> = ticks
        .windows(2)
        .map(|w| f64::from(w[1]) - f64::from(w[0]))
        .collect();
    let n = changes.len() as f64;
    let mean = changes.iter().sum::<f64>() / n;
    let variance = changes.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Closes positions past their holding period and opens a band sized by
/// recent volatility when the pool is calm and nothing is open.
///
/// The band is `tick ± std * sqrt(horizon_buckets)`, each bound rounded to the
/// nearest spacing multiple.
#[derive(Debug, Clone)]
pub struct VolatilityBandPolicy {
    config: StrategyConfig,
}

impl VolatilityBandPolicy {
    /// Creates the policy.
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Tick-change deviation over the trailing window, once the window is full.
    pub fn volatility(&self, swaps: &[SwapEvent]) -> Option<f64> {
        let ticks = downsample(swaps, self.config.bucket_blocks);
        let window = self.config.volatility_window;
        if ticks.len() < window {
            return None;
        }
        tick_change_std(&ticks[ticks.len() - window..])
    }
}

impl StrategyPolicy for VolatilityBandPolicy {
    fn decide(&self, ctx: &StrategyContext) -> Vec<Decision> {
        let mut decisions: Vec<Decision> = ctx
            .open_positions
            .iter()
            .filter(|p| {
                p.opened_block.saturating_add(self.config.max_hold_blocks) <= ctx.current_block
            })
            .map(|p| Decision::Close { index: p.index })
            .collect();

        if ctx.open_positions.len() > decisions.len() {
            return decisions;
        }

        let Some(std) = self.volatility(&ctx.snapshot.swaps) else {
            debug!(
                swaps = ctx.snapshot.swaps.len(),
                window = self.config.volatility_window,
                "Not enough history for volatility"
            );
            return decisions;
        };
        if std > self.config.volatility_threshold {
            debug!(
                std = std,
                threshold = self.config.volatility_threshold,
                "Volatility above threshold"
            );
            return decisions;
        }

        let half_width = std * f64::from(self.config.horizon_buckets).sqrt();
        match TickRange::around(f64::from(ctx.current_tick), half_width, ctx.tick_spacing) {
            Ok(range) => decisions.push(Decision::Open {
                range,
                deposit: self.config.deposit,
            }),
            Err(e) => warn!(
                tick = ctx.current_tick,
                half_width = half_width,
                error = %e,
                "Could not build range"
            ),
        }
        decisions
    }
}
