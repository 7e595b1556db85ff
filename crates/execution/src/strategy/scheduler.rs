//! Strategy scheduler loop.

use super::{Decision, StrategyContext, StrategyPolicy};
use crate::config::{RunMode, StrategyConfig};
use crate::lifecycle::{CloseOutcome, OpenOutcome, PositionCommands};
use crate::sync::SharedPoolState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, info, info_span, warn};

/// What one scheduler cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Decisions the policy returned.
    pub decisions: usize,
    /// Positions opened.
    pub opened: usize,
    /// Positions closed with a record.
    pub closed: usize,
    /// Opens and closes dropped over uninitialized ticks.
    pub discarded: usize,
    /// Decisions whose command failed.
    pub failed: usize,
    /// Opens dropped because a close in the same cycle failed.
    pub skipped: usize,
}

impl CycleReport {
    /// Whether the policy asked for nothing.
    pub fn is_idle(&self) -> bool {
        self.decisions == 0
    }
}

/// Why the scheduler loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// Stopped on request.
    Stopped,
    /// The synchronizer reported the end of its event source.
    Exhausted,
    /// The task panicked or was cancelled.
    Aborted,
}

/// Periodically asks a policy for decisions and applies them.
///
/// Runs on its own task; a slow open or close delays only the next cycle,
/// never the synchronizer.
pub struct StrategyScheduler<M: ?Sized, P> {
    /// Position commands.
    commands: Arc<M>,
    /// Decision rule.
    policy: P,
    /// Shared pool view.
    state: Arc<SharedPoolState>,
    /// Pool tick spacing.
    tick_spacing: i32,
    /// Cadence settings.
    config: StrategyConfig,
    /// Run mode, selects the cadence.
    mode: RunMode,
    /// Running flag.
    running: Arc<AtomicBool>,
    /// Logging span.
    span: Span,
}

impl<M, P> StrategyScheduler<M, P>
where
    M: PositionCommands + ?Sized + 'static,
    P: StrategyPolicy + 'static,
{
    /// Creates a scheduler.
    pub fn new(
        commands: Arc<M>,
        policy: P,
        state: Arc<SharedPoolState>,
        tick_spacing: i32,
        config: StrategyConfig,
        mode: RunMode,
    ) -> Self {
        Self {
            commands,
            policy,
            state,
            tick_spacing,
            config,
            mode,
            running: Arc::new(AtomicBool::new(true)),
            span: info_span!("scheduler"),
        }
    }

    /// Logs inside `span` instead of the default one.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Asks [`run`](Self::run) to return at the top of its next iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Runs one decision cycle against the current snapshot.
    ///
    /// Closes are applied before opens. A failed command is logged and
    /// counted; the remaining closes still run. Opens are planned against the
    /// book after every close, so they are skipped once any close fails.
    pub async fn cycle(&self) -> CycleReport {
        let snapshot = self.state.snapshot(self.state.max_history_len()).await;
        let (Some(current_block), Some(current_tick)) =
            (snapshot.current_block, snapshot.current_tick)
        else {
            return CycleReport::default();
        };

        let ctx = StrategyContext {
            current_block,
            current_tick,
            tick_spacing: self.tick_spacing,
            snapshot,
            open_positions: self.commands.open_positions().await,
        };
        let mut decisions = self.policy.decide(&ctx);
        // stable: keeps the policy's order within closes and within opens
        decisions.sort_by_key(|d| matches!(d, Decision::Open { .. }));

        let mut report = CycleReport {
            decisions: decisions.len(),
            ..CycleReport::default()
        };

        let mut close_failed = false;
        for decision in decisions {
            match decision {
                Decision::Close { index } => match self.commands.close(index).await {
                    Ok(CloseOutcome::Closed(_)) => report.closed += 1,
                    Ok(CloseOutcome::Discarded) => report.discarded += 1,
                    Err(e) => {
                        warn!(index = index, block = current_block, error = %e, "Close failed");
                        report.failed += 1;
                        close_failed = true;
                    }
                },
                Decision::Open { range, .. } if close_failed => {
                    debug!(
                        lower = range.lower(),
                        upper = range.upper(),
                        block = current_block,
                        "Open skipped after a failed close"
                    );
                    report.skipped += 1;
                }
                Decision::Open { range, deposit } => {
                    match self.commands.open(range, deposit).await {
                        Ok(OpenOutcome::Opened(_)) => report.opened += 1,
                        Ok(OpenOutcome::Discarded) => report.discarded += 1,
                        Err(e) => {
                            warn!(
                                lower = range.lower(),
                                upper = range.upper(),
                                block = current_block,
                                error = %e,
                                "Open failed"
                            );
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        if !report.is_idle() {
            debug!(
                block = current_block,
                tick = current_tick,
                opened = report.opened,
                closed = report.closed,
                discarded = report.discarded,
                failed = report.failed,
                skipped = report.skipped,
                "Cycle applied"
            );
        }
        report
    }

    /// Waits for the first tick, then cycles until stopped or exhausted.
    pub async fn run(&self) -> SchedulerExit {
        let span = self.span.clone();
        async {
            info!(mode = ?self.mode, "Starting scheduler");

            loop {
                if !self.running.load(Ordering::SeqCst) {
                    info!("Scheduler stopped before the first tick");
                    return SchedulerExit::Stopped;
                }
                match tokio::time::timeout(
                    self.config.first_tick_poll(),
                    self.state.wait_for_first_tick(),
                )
                .await
                {
                    Ok(Some(tick)) => {
                        info!(tick = tick, "First tick observed");
                        break;
                    }
                    Ok(None) => {
                        info!("Event source ended before the first tick");
                        return SchedulerExit::Exhausted;
                    }
                    Err(_) => debug!("Waiting for the first tick"),
                }
            }

            while self.running.load(Ordering::SeqCst) {
                if self.state.is_exhausted() {
                    info!("Event source exhausted");
                    return SchedulerExit::Exhausted;
                }
                pause(self.config.cycle_delay(self.mode)).await;

                if self.cycle().await.is_idle() {
                    pause(self.config.idle_backoff()).await;
                }
            }

            info!("Scheduler stopped");
            SchedulerExit::Stopped
        }
        .instrument(span)
        .await
    }

    /// Moves the scheduler onto its own task.
    pub fn spawn(self) -> SchedulerHandle {
        let running = self.running.clone();
        let task = tokio::spawn(async move { self.run().await });
        SchedulerHandle { running, task }
    }
}

/// Sleeps, or only yields for a zero delay.
async fn pause(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}

/// Handle to a spawned scheduler.
pub struct SchedulerHandle {
    running: Arc<AtomicBool>,
    task: JoinHandle<SchedulerExit>,
}

impl SchedulerHandle {
    /// Asks the loop to stop at the top of its next iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the loop task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to end.
    pub async fn join(self) -> SchedulerExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => {
                warn!(error = %e, "Scheduler task failed");
                SchedulerExit::Aborted
            }
        }
    }

    /// Stops the loop and waits for it.
    pub async fn shutdown(self) -> SchedulerExit {
        self.stop();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::lifecycle::OpenPositionView;
    use crate::strategy::VolatilityBandPolicy;
    use crate::sync::BlockAdvance;
    use async_trait::async_trait;
    use primitive_types::U256;
    use tokio::sync::Mutex;
    use v3lp_domain::entities::SwapEvent;
    use v3lp_domain::value_objects::{Deposit, TickRange};

    /// Records commands and keeps a minimal open set.
    #[derive(Default)]
    struct RecordingCommands {
        open: Mutex<Vec<OpenPositionView>>,
        opened: Mutex<Vec<TickRange>>,
        closed: Mutex<Vec<(usize, u64)>>,
        block: Mutex<u64>,
        fail_opens: AtomicBool,
        fail_closes: AtomicBool,
    }

    #[async_trait]
    impl PositionCommands for RecordingCommands {
        async fn open_positions(&self) -> Vec<OpenPositionView> {
            self.open.lock().await.clone()
        }

        async fn open(
            &self,
            range: TickRange,
            _deposit: Deposit,
        ) -> Result<OpenOutcome, ExecutionError> {
            if self.fail_opens.load(Ordering::SeqCst) {
                return Err(ExecutionError::NoBlockObserved);
            }
            let mut opened = self.opened.lock().await;
            let index = opened.len();
            opened.push(range);
            self.open.lock().await.push(OpenPositionView {
                index,
                opened_block: *self.block.lock().await,
                lower_tick: range.lower(),
                upper_tick: range.upper(),
            });
            Ok(OpenOutcome::Opened(index))
        }

        async fn close(&self, index: usize) -> Result<CloseOutcome, ExecutionError> {
            if self.fail_closes.load(Ordering::SeqCst) {
                return Err(ExecutionError::NoBlockObserved);
            }
            let mut open = self.open.lock().await;
            let Some(at) = open.iter().position(|p| p.index == index) else {
                return Err(ExecutionError::PositionNotOpen(index));
            };
            open.remove(at);
            self.closed
                .lock()
                .await
                .push((index, *self.block.lock().await));
            Ok(CloseOutcome::Discarded)
        }
    }

    fn swap(block: u64, tick: i32) -> SwapEvent {
        SwapEvent {
            block,
            tick,
            liquidity: 1,
            sqrt_price_x96: U256::zero(),
            amount0: 0,
            amount1: 0,
        }
    }

    async fn advance(
        state: &SharedPoolState,
        commands: &RecordingCommands,
        block: u64,
        tick: i32,
    ) {
        *commands.block.lock().await = block;
        state
            .advance(BlockAdvance {
                block,
                swaps: vec![swap(block, tick)],
                tick: Some(tick),
                ..Default::default()
            })
            .await;
    }

    fn scheduler(
        commands: Arc<RecordingCommands>,
        state: Arc<SharedPoolState>,
    ) -> StrategyScheduler<RecordingCommands, VolatilityBandPolicy> {
        let config = StrategyConfig::default()
            .with_idle_backoff_ms(0)
            .with_first_tick_poll_ms(5);
        StrategyScheduler::new(
            commands,
            VolatilityBandPolicy::new(config.clone()),
            state,
            10,
            config,
            RunMode::Replay,
        )
    }

    #[tokio::test]
    async fn test_cycle_without_tick_is_idle() {
        let state = Arc::new(SharedPoolState::new(1000));
        let commands = Arc::new(RecordingCommands::default());
        let report = scheduler(commands, state).cycle().await;
        assert!(report.is_idle());
    }

    #[tokio::test]
    async fn test_calm_stream_opens_exactly_once() {
        let state = Arc::new(SharedPoolState::new(1000));
        let commands = Arc::new(RecordingCommands::default());
        let scheduler = scheduler(commands.clone(), state.clone());

        let pattern = [100, 100, 105, 105, 98, 100];
        for i in 0..150u64 {
            advance(&state, &commands, i * 5 + 1, pattern[i as usize % pattern.len()]).await;
        }

        let report = scheduler.cycle().await;
        assert_eq!(report.opened, 1);
        assert!(scheduler.cycle().await.is_idle());

        let opened = commands.opened.lock().await.clone();
        assert_eq!(opened.len(), 1);
        // the last bucket's tick is 100
        assert_eq!(100 - opened[0].lower(), opened[0].upper() - 100);
        assert_eq!(opened[0].lower() % 10, 0);
    }

    #[tokio::test]
    async fn test_position_closed_at_hold_limit_not_before() {
        let state = Arc::new(SharedPoolState::new(1000));
        let commands = Arc::new(RecordingCommands::default());
        let scheduler = scheduler(commands.clone(), state.clone());

        for i in 0..150u64 {
            advance(&state, &commands, i * 5 + 1, 100).await;
        }
        let opened_at = 746;
        assert_eq!(scheduler.cycle().await.opened, 1);

        for block in [opened_at + 1, opened_at + 150, opened_at + 299] {
            advance(&state, &commands, block, 100).await;
            let report = scheduler.cycle().await;
            assert_eq!(report.closed + report.discarded, 0);
        }
        assert!(commands.closed.lock().await.is_empty());

        advance(&state, &commands, opened_at + 300, 100).await;
        let report = scheduler.cycle().await;
        assert_eq!(report.discarded, 1);
        assert_eq!(*commands.closed.lock().await, vec![(0, opened_at + 300)]);
        // the same cycle reopens once the book is flat
        assert_eq!(report.opened, 1);
    }

    #[tokio::test]
    async fn test_failed_open_is_counted_not_fatal() {
        let state = Arc::new(SharedPoolState::new(1000));
        let commands = Arc::new(RecordingCommands::default());
        commands.fail_opens.store(true, Ordering::SeqCst);
        let scheduler = scheduler(commands.clone(), state.clone());

        for i in 0..150u64 {
            advance(&state, &commands, i * 5 + 1, 100).await;
        }
        let report = scheduler.cycle().await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.opened, 0);
    }

    #[tokio::test]
    async fn test_failed_close_skips_reopen() {
        let state = Arc::new(SharedPoolState::new(1000));
        let commands = Arc::new(RecordingCommands::default());
        let scheduler = scheduler(commands.clone(), state.clone());

        for i in 0..150u64 {
            advance(&state, &commands, i * 5 + 1, 100).await;
        }
        assert_eq!(scheduler.cycle().await.opened, 1);

        advance(&state, &commands, 746 + 300, 100).await;
        commands.fail_closes.store(true, Ordering::SeqCst);
        let report = scheduler.cycle().await;
        assert_eq!(
            report,
            CycleReport {
                decisions: 2,
                failed: 1,
                skipped: 1,
                ..CycleReport::default()
            }
        );
        assert_eq!(commands.open.lock().await.len(), 1);

        // the next cycle retries the close and reopens
        commands.fail_closes.store(false, Ordering::SeqCst);
        let report = scheduler.cycle().await;
        assert_eq!((report.discarded, report.opened), (1, 1));
        assert_eq!(commands.open.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_run_ends_when_source_exhausted_before_first_tick() {
        let state = Arc::new(SharedPoolState::new(10));
        let commands = Arc::new(RecordingCommands::default());
        let handle = scheduler(commands, state.clone()).spawn();

        state.mark_exhausted();
        assert_eq!(handle.join().await, SchedulerExit::Exhausted);
    }

    #[tokio::test]
    async fn test_run_stops_on_request() {
        let state = Arc::new(SharedPoolState::new(10));
        let commands = Arc::new(RecordingCommands::default());
        let handle = scheduler(commands.clone(), state.clone()).spawn();

        advance(&state, &commands, 1, 100).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        assert_eq!(handle.shutdown().await, SchedulerExit::Stopped);
    }
}
