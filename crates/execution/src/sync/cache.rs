//! Tick-range cache and its refresh worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, Notify, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use v3lp_domain::entities::TickState;
use v3lp_domain::math::floor_to_spacing;
use v3lp_protocols::chain::ChainClient;
use v3lp_protocols::error::ChainError;

/// Outcome of one cache refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    /// Ticks fetched from the chain.
    pub fetched: usize,
    /// Whether the map was rebuilt from scratch.
    pub full: bool,
}

/// Sparse map from spacing-aligned tick to its on-chain state.
///
/// A key that is absent has not been fetched; `Some(None)` from [`get`](Self::get)
/// marks a tick known to be uninitialized.
#[derive(Debug)]
pub struct TickRangeCache {
    spacing: i32,
    radius: i32,
    entries: RwLock<HashMap<i32, Option<TickState>>>,
}

impl TickRangeCache {
    /// Creates an empty cache covering `radius` ticks either side of the current tick.
    pub fn new(spacing: i32, radius: i32) -> Self {
        Self {
            spacing: spacing.max(1),
            radius: radius.max(0),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn spacing(&self) -> i32 {
        self.spacing
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Spacing-aligned ticks within `radius` of `tick` rounded down to spacing.
    pub fn window(&self, tick: i32) -> impl Iterator<Item = i32> + use<> {
        let below = floor_to_spacing(tick, self.spacing);
        let steps = self.radius / self.spacing;
        let spacing = self.spacing;
        (-steps..=steps).map(move |k| below + k * spacing)
    }

    /// Cached state of `tick`: `None` if never fetched, `Some(None)` if uninitialized.
    pub async fn get(&self, tick: i32) -> Option<Option<TickState>> {
        self.entries.read().await.get(&tick).copied()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Copy of every entry.
    pub async fn entries(&self) -> HashMap<i32, Option<TickState>> {
        self.entries.read().await.clone()
    }

    /// Brings the window around `tick` up to date.
    ///
    /// A full refresh refetches the whole window and replaces the map in one
    /// write. Otherwise only window ticks missing from the map are fetched;
    /// known ticks are left as they are. Fetches run without holding the lock,
    /// and nothing is written if any fetch fails.
    ///
    /// # Errors
    /// Returns the first failed tick query.
    pub async fn refresh<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        tick: i32,
        block: u64,
        force_full: bool,
    ) -> Result<RefreshStats, ChainError> {
        let targets: Vec<i32> = if force_full {
            self.window(tick).collect()
        } else {
            let entries = self.entries.read().await;
            self.window(tick)
                .filter(|t| !entries.contains_key(t))
                .collect()
        };

        let mut fetched = HashMap::with_capacity(targets.len());
        for t in targets {
            fetched.insert(t, client.tick_state(t, block).await?);
        }
        let count = fetched.len();

        let mut entries = self.entries.write().await;
        if force_full {
            *entries = fetched;
        } else {
            for (t, state) in fetched {
                entries.entry(t).or_insert(state);
            }
        }

        debug!(
            tick = tick,
            block = block,
            fetched = count,
            full = force_full,
            cached = entries.len(),
            "Tick cache refreshed"
        );

        Ok(RefreshStats {
            fetched: count,
            full: force_full,
        })
    }
}

/// A pending cache refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    /// Tick the window is centred on.
    pub tick: i32,
    /// Block the ticks are read at.
    pub block: u64,
    /// Rebuild the whole window.
    pub force_full: bool,
    /// Increasing request number.
    pub generation: u64,
}

#[derive(Debug, Default)]
struct RefreshQueue {
    pending: Mutex<Option<RefreshRequest>>,
    wake: Notify,
    next_generation: AtomicU64,
}

/// Cloneable handle for queueing refreshes.
///
/// The queue holds a single slot: a request arriving while another is pending
/// replaces its tick and block, keeps `force_full` if either asked for it, and
/// takes a new generation.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    queue: Arc<RefreshQueue>,
    completed: watch::Receiver<u64>,
}

impl RefreshHandle {
    /// Queues a refresh without waiting for it. Returns its generation.
    pub async fn request(&self, tick: i32, block: u64, force_full: bool) -> u64 {
        let generation = self.queue.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut pending = self.queue.pending.lock().await;
            let force_full = force_full || pending.is_some_and(|p| p.force_full);
            *pending = Some(RefreshRequest {
                tick,
                block,
                force_full,
                generation,
            });
        }
        self.queue.wake.notify_one();
        generation
    }

    /// Generation of the last request the worker finished, 0 if none.
    pub fn completed_generation(&self) -> u64 {
        *self.completed.borrow()
    }

    /// Waits until the worker has finished `generation` or a later request.
    pub async fn wait_for(&self, generation: u64) {
        let mut completed = self.completed.clone();
        // returns early once the worker has exited
        let _ = completed.wait_for(|done| *done >= generation).await;
    }
}

/// Background task that owns every cache write.
pub struct CacheRefresher {
    handle: RefreshHandle,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl CacheRefresher {
    /// Spawns the worker on the current runtime.
    pub fn spawn<C>(cache: Arc<TickRangeCache>, client: Arc<C>) -> Self
    where
        C: ChainClient + ?Sized + 'static,
    {
        Self::spawn_with_span(cache, client, info_span!("cache_refresher"))
    }

    /// Spawns the worker, logging inside `span`.
    pub fn spawn_with_span<C>(cache: Arc<TickRangeCache>, client: Arc<C>, span: Span) -> Self
    where
        C: ChainClient + ?Sized + 'static,
    {
        let queue = Arc::new(RefreshQueue::default());
        let (done_tx, done_rx) = watch::channel(0u64);
        let running = Arc::new(AtomicBool::new(true));

        let worker = {
            let queue = queue.clone();
            let running = running.clone();
            async move {
                info!(radius = cache.radius(), spacing = cache.spacing(), "Cache refresher started");
                while running.load(Ordering::SeqCst) {
                    let request = queue.pending.lock().await.take();
                    let Some(request) = request else {
                        queue.wake.notified().await;
                        continue;
                    };

                    if let Err(e) = cache
                        .refresh(&*client, request.tick, request.block, request.force_full)
                        .await
                    {
                        warn!(
                            tick = request.tick,
                            block = request.block,
                            generation = request.generation,
                            error = %e,
                            "Tick cache refresh failed"
                        );
                    }
                    done_tx.send_replace(request.generation);
                }
                info!("Cache refresher stopped");
            }
            .instrument(span)
        };

        Self {
            handle: RefreshHandle {
                queue,
                completed: done_rx,
            },
            running,
            task: tokio::spawn(worker),
        }
    }

    /// A handle for queueing requests.
    pub fn handle(&self) -> RefreshHandle {
        self.handle.clone()
    }

    /// Signals the worker to stop after its current refresh and waits for it.
    pub async fn shutdown(self) {
        self.running.store(false, Ordering::SeqCst);
        self.handle.queue.wake.notify_one();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Cache refresher task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use v3lp_protocols::simulated::SimulatedChain;

    async fn chain_with_ticks(ticks: &[i32]) -> Arc<SimulatedChain> {
        let chain = Arc::new(SimulatedChain::new(10));
        for &t in ticks {
            chain
                .set_tick_state(t, TickState::new(i128::from(t), U256::zero(), U256::zero()))
                .await;
        }
        chain
    }

    #[test]
    fn test_window_is_aligned_and_centred_below() {
        let cache = TickRangeCache::new(10, 25);
        assert_eq!(cache.window(37).collect::<Vec<_>>(), vec![10, 20, 30, 40, 50]);
        assert_eq!(cache.window(-1).collect::<Vec<_>>(), vec![-30, -20, -10, 0, 10]);
    }

    #[tokio::test]
    async fn test_full_refresh_covers_window_with_markers() {
        let chain = chain_with_ticks(&[80, 100]).await;
        let cache = TickRangeCache::new(10, 30);

        let stats = cache.refresh(chain.as_ref(), 95, 1, true).await.unwrap();
        assert_eq!(stats, RefreshStats { fetched: 7, full: true });
        for t in cache.window(95) {
            assert!(cache.get(t).await.is_some(), "tick {t} missing");
        }
        assert!(cache.get(80).await.unwrap().is_some());
        assert_eq!(cache.get(70).await, Some(None));
        assert_eq!(cache.get(200).await, None);
    }

    #[tokio::test]
    async fn test_incremental_refresh_keeps_known_entries() {
        let chain = chain_with_ticks(&[100]).await;
        let cache = TickRangeCache::new(10, 20);
        cache.refresh(chain.as_ref(), 100, 1, true).await.unwrap();
        let before = cache.entries().await;

        chain
            .set_tick_state(100, TickState::new(-5, U256::one(), U256::one()))
            .await;
        let stats = cache.refresh(chain.as_ref(), 110, 2, false).await.unwrap();

        assert_eq!(stats.fetched, 1);
        assert_eq!(cache.get(100).await, before.get(&100).copied());
        assert_eq!(cache.len().await, 6);

        // a full refresh drops stale entries
        cache.refresh(chain.as_ref(), 100, 3, true).await.unwrap();
        assert_eq!(cache.get(100).await.unwrap().unwrap().liquidity_net, -5);
        assert_eq!(cache.len().await, 5);
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_untouched() {
        let chain = chain_with_ticks(&[]).await;
        let cache = TickRangeCache::new(10, 20);
        chain.fail_next_call("boom").await;
        assert!(cache.refresh(chain.as_ref(), 0, 1, true).await.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_refresher_processes_requests() {
        let chain = chain_with_ticks(&[0]).await;
        let cache = Arc::new(TickRangeCache::new(10, 20));
        let refresher = CacheRefresher::spawn(cache.clone(), chain.clone());
        let handle = refresher.handle();

        let generation = handle.request(0, 1, true).await;
        handle.wait_for(generation).await;
        assert!(handle.completed_generation() >= generation);
        assert_eq!(cache.len().await, 5);
        assert!(cache.get(0).await.unwrap().is_some());

        refresher.shutdown().await;
    }

    #[tokio::test]
    async fn test_pending_requests_coalesce() {
        let queue_owner = CacheRefresher {
            handle: RefreshHandle {
                queue: Arc::new(RefreshQueue::default()),
                completed: watch::channel(0).1,
            },
            running: Arc::new(AtomicBool::new(false)),
            task: tokio::spawn(async {}),
        };
        let handle = queue_owner.handle();

        handle.request(10, 1, true).await;
        let last = handle.request(30, 2, false).await;

        let pending = handle.queue.pending.lock().await.take().unwrap();
        assert_eq!(pending.tick, 30);
        assert_eq!(pending.block, 2);
        assert!(pending.force_full);
        assert_eq!(pending.generation, last);
        assert_eq!(last, 2);

        queue_owner.shutdown().await;
    }
}
