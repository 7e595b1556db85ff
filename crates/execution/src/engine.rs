//! Wiring of the synchronizer, cache refresher, position manager and scheduler.

use crate::config::EngineConfig;
use crate::error::ExecutionError;
use crate::lifecycle::{AggregateStats, PositionManager};
use crate::strategy::{
    SchedulerExit, SchedulerHandle, StrategyPolicy, StrategyScheduler, VolatilityBandPolicy,
};
use crate::sync::{
    CacheRefresher, ProtocolSynchronizer, SharedPoolState, SyncExit, SyncHandle, TickRangeCache,
};
use std::sync::Arc;
use tracing::{info, info_span};
use v3lp_domain::value_objects::PerformanceRecord;
use v3lp_protocols::chain::ChainClient;

/// Final state of an engine run.
#[derive(Debug, Clone)]
pub struct EngineReport {
    /// How the synchronizer ended.
    pub sync: SyncExit,
    /// How the scheduler ended.
    pub scheduler: SchedulerExit,
    /// Position statistics at shutdown.
    pub stats: AggregateStats,
    /// Performance log in close order.
    pub performance: Vec<PerformanceRecord>,
}

/// A running tracker: one pool, one strategy.
pub struct Engine<C: ?Sized> {
    state: Arc<SharedPoolState>,
    cache: Arc<TickRangeCache>,
    manager: Arc<PositionManager<C>>,
    refresher: CacheRefresher,
    sync: SyncHandle,
    scheduler: SchedulerHandle,
}

impl<C: ChainClient + ?Sized + 'static> Engine<C> {
    /// Starts every task with the bundled volatility-band policy.
    ///
    /// # Errors
    /// Returns `Config` if the configuration does not validate.
    pub fn start(client: Arc<C>, config: EngineConfig) -> Result<Self, ExecutionError> {
        let policy = VolatilityBandPolicy::new(config.strategy.clone());
        Self::start_with_policy(client, config, policy)
    }

    /// Starts every task on the current runtime with `policy` deciding.
    ///
    /// # Errors
    /// Returns `Config` if the configuration does not validate.
    pub fn start_with_policy<P>(
        client: Arc<C>,
        config: EngineConfig,
        policy: P,
    ) -> Result<Self, ExecutionError>
    where
        P: StrategyPolicy + 'static,
    {
        config.validate()?;
        let mode = config.mode;
        let spacing = client.tick_spacing();
        let span = info_span!("engine", mode = ?mode);

        let state = Arc::new(SharedPoolState::new(config.sync.max_history_len));
        let cache = Arc::new(TickRangeCache::new(spacing, config.sync.cache_radius));
        let refresher = CacheRefresher::spawn_with_span(
            cache.clone(),
            client.clone(),
            info_span!(parent: &span, "cache_refresher"),
        );
        let manager = Arc::new(
            PositionManager::new(client.clone(), state.clone(), cache.clone(), mode)
                .with_span(info_span!(parent: &span, "position_manager")),
        );

        let sync = ProtocolSynchronizer::new(
            client,
            state.clone(),
            refresher.handle(),
            config.sync.clone(),
            mode,
        )
        .with_span(info_span!(parent: &span, "synchronizer"))
        .spawn();
        let scheduler = StrategyScheduler::new(
            manager.clone(),
            policy,
            state.clone(),
            spacing,
            config.strategy.clone(),
            mode,
        )
        .with_span(info_span!(parent: &span, "scheduler"))
        .spawn();

        span.in_scope(|| {
            info!(
                spacing = spacing,
                cache_radius = config.sync.cache_radius,
                max_history_len = config.sync.max_history_len,
                "Engine started"
            );
        });

        Ok(Self {
            state,
            cache,
            manager,
            refresher,
            sync,
            scheduler,
        })
    }

    pub fn state(&self) -> &Arc<SharedPoolState> {
        &self.state
    }

    pub fn cache(&self) -> &Arc<TickRangeCache> {
        &self.cache
    }

    pub fn manager(&self) -> &Arc<PositionManager<C>> {
        &self.manager
    }

    /// Whether both loops have ended.
    pub fn is_finished(&self) -> bool {
        self.sync.is_finished() && self.scheduler.is_finished()
    }

    /// Waits for the event source to run out, then stops everything.
    ///
    /// The scheduler ends on its own once it sees the exhaustion; if the
    /// synchronizer ends any other way the scheduler is asked to stop.
    pub async fn run_to_completion(self) -> EngineReport {
        let sync = self.sync.join().await;
        if sync != SyncExit::Exhausted {
            self.scheduler.stop();
        }
        let scheduler = self.scheduler.join().await;
        Self::finish(self.manager, self.refresher, sync, scheduler).await
    }

    /// Stops both loops at their next iteration and waits for them.
    pub async fn shutdown(self) -> EngineReport {
        self.sync.stop();
        self.scheduler.stop();
        let sync = self.sync.join().await;
        let scheduler = self.scheduler.join().await;
        Self::finish(self.manager, self.refresher, sync, scheduler).await
    }

    async fn finish(
        manager: Arc<PositionManager<C>>,
        refresher: CacheRefresher,
        sync: SyncExit,
        scheduler: SchedulerExit,
    ) -> EngineReport {
        refresher.shutdown().await;
        let stats = manager.aggregate_stats().await;
        info!(
            sync = ?sync,
            scheduler = ?scheduler,
            opened = stats.total_positions,
            closed = stats.closed_positions,
            discarded = stats.discarded,
            total_fees = stats.total_fees,
            "Engine finished"
        );
        EngineReport {
            sync,
            scheduler,
            stats,
            performance: manager.performance().await,
        }
    }
}
