//! Protocol state synchronizer.

use super::cache::RefreshHandle;
use super::state::{BlockAdvance, SharedPoolState};
use crate::config::{RunMode, SyncConfig};
use crate::error::ExecutionError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use v3lp_domain::entities::{BlockRange, LiquidityEventKind};
use v3lp_protocols::chain::{ChainClient, ChainHead};

/// Result of one synchronizer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The head has not moved.
    Waiting,
    /// Events were ingested but none were swaps; the tick is unchanged.
    NoSwaps {
        /// New head.
        block: u64,
    },
    /// Events were ingested and the tick updated.
    Advanced {
        /// New head.
        block: u64,
        /// Tick after the latest swap.
        tick: i32,
        /// Whether a cache refresh was queued.
        refresh_queued: bool,
    },
    /// The event source has ended.
    Exhausted,
}

/// Why the synchronizer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncExit {
    /// Stopped on request.
    Stopped,
    /// The replayed source ran out of blocks.
    Exhausted,
    /// The task panicked or was cancelled.
    Aborted,
}

/// Advances block by block, feeding histories and the tick cache.
pub struct ProtocolSynchronizer<C: ?Sized> {
    /// Chain access.
    client: Arc<C>,
    /// Shared pool view.
    state: Arc<SharedPoolState>,
    /// Cache refresh queue.
    refresher: RefreshHandle,
    /// Configuration.
    config: SyncConfig,
    /// Run mode, selects the cadence.
    mode: RunMode,
    /// Last block ingested.
    last_block: Option<u64>,
    /// A mint or burn was ingested and no full refresh has been queued since.
    pending_full_refresh: bool,
    /// Running flag.
    running: Arc<AtomicBool>,
    /// Logging span.
    span: Span,
}

impl<C: ChainClient + ?Sized + 'static> ProtocolSynchronizer<C> {
    /// Creates a synchronizer that starts from the next head it observes.
    pub fn new(
        client: Arc<C>,
        state: Arc<SharedPoolState>,
        refresher: RefreshHandle,
        config: SyncConfig,
        mode: RunMode,
    ) -> Self {
        Self {
            client,
            state,
            refresher,
            config,
            mode,
            last_block: None,
            pending_full_refresh: false,
            running: Arc::new(AtomicBool::new(true)),
            span: info_span!("synchronizer"),
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

    /// Last block ingested.
    pub fn last_block(&self) -> Option<u64> {
        self.last_block
    }

    /// Ingests everything between the last block and the current head.
    ///
    /// On the first call the head block itself is ingested. A mint or burn in
    /// a step without swaps forces the next queued refresh to be full. Nothing is
    /// committed if any chain call fails, so the next step retries the same
    /// range.
    ///
    /// # Errors
    /// Returns the first failed chain call.
    pub async fn step(&mut self) -> Result<StepOutcome, ExecutionError> {
        let block = match self.client.current_block().await? {
            ChainHead::At(block) => block,
            ChainHead::Exhausted => {
                self.state.mark_exhausted();
                return Ok(StepOutcome::Exhausted);
            }
        };

        let last = self.last_block.unwrap_or_else(|| block.saturating_sub(1));
        if block == last {
            self.last_block = Some(block);
            return Ok(StepOutcome::Waiting);
        }
        if block < last {
            warn!(block = block, last_block = last, "Head moved backwards");
            self.last_block = Some(block);
            return Ok(StepOutcome::Waiting);
        }

        let range = BlockRange::new(last, block);
        let swaps = self.client.swap_events(range).await?;
        let mints = self
            .client
            .liquidity_events(range, LiquidityEventKind::Mint)
            .await?;
        let burns = self
            .client
            .liquidity_events(range, LiquidityEventKind::Burn)
            .await?;

        debug!(
            from = range.after + 1,
            through = range.through,
            swaps = swaps.len(),
            mints = mints.len(),
            burns = burns.len(),
            "Ingested events"
        );

        let force_full = self.pending_full_refresh || !mints.is_empty() || !burns.is_empty();
        let latest_tick = swaps.last().map(|s| s.tick);

        let mut refresh_queued = false;
        let mut liquidity = None;
        if let Some(tick) = latest_tick {
            let previous = self.state.current_tick().await;
            if force_full || previous != Some(tick) {
                liquidity = Some(self.client.pool_liquidity(block).await?);
                refresh_queued = true;
            }
        }

        self.state
            .advance(BlockAdvance {
                block,
                swaps,
                mints,
                burns,
                tick: latest_tick,
                liquidity,
            })
            .await;
        self.last_block = Some(block);

        let Some(tick) = latest_tick else {
            self.pending_full_refresh = force_full;
            return Ok(StepOutcome::NoSwaps { block });
        };

        if refresh_queued {
            let generation = self.refresher.request(tick, block, force_full).await;
            self.pending_full_refresh = false;
            debug!(
                tick = tick,
                block = block,
                force_full = force_full,
                generation = generation,
                "Queued tick cache refresh"
            );
        }

        Ok(StepOutcome::Advanced {
            block,
            tick,
            refresh_queued,
        })
    }

    /// Runs until stopped or the source is exhausted.
    pub async fn run(&mut self) -> SyncExit {
        let span = self.span.clone();
        async {
            info!(mode = ?self.mode, "Starting synchronizer");

            while self.running.load(Ordering::SeqCst) {
                let pause = match self.step().await {
                    Ok(StepOutcome::Exhausted) => {
                        info!(last_block = ?self.last_block, "Event source exhausted");
                        return SyncExit::Exhausted;
                    }
                    Ok(StepOutcome::Waiting) => self.config.block_wait(),
                    Ok(_) => self.config.poll_delay(self.mode),
                    Err(e) => {
                        warn!(error = %e, last_block = ?self.last_block, "Synchronizer step failed");
                        self.config.poll_delay(self.mode)
                    }
                };
                tokio::time::sleep(pause).await;
            }

            info!(last_block = ?self.last_block, "Synchronizer stopped");
            SyncExit::Stopped
        }
        .instrument(span)
        .await
    }

    /// Moves the synchronizer onto its own task.
    pub fn spawn(mut self) -> SyncHandle {
        let running = self.running.clone();
        let task = tokio::spawn(async move { self.run().await });
        SyncHandle { running, task }
    }
}

/// Handle to a spawned synchronizer.
pub struct SyncHandle {
    running: Arc<AtomicBool>,
    task: JoinHandle<SyncExit>,
}

impl SyncHandle {
    /// Asks the loop to stop at the top of its next iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the loop task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to end.
    pub async fn join(self) -> SyncExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => {
                warn!(error = %e, "Synchronizer task failed");
                SyncExit::Aborted
            }
        }
    }

    /// Stops the loop and waits for it.
    pub async fn shutdown(self) -> SyncExit {
        self.stop();
        self.join().await
    }
}
