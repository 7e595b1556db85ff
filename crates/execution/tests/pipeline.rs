//! Synchronizer, cache and manager driven step by step against a simulated chain.

mod common;

use common::{init_tracing, initialize_ticks};
use primitive_types::U256;
use std::sync::Arc;
use v3lp_domain::entities::LiquidityEventKind;
use v3lp_domain::math::FeeGrowthX128;
use v3lp_domain::value_objects::{Deposit, TickRange};
use v3lp_execution::prelude::*;
use v3lp_protocols::simulated::SimulatedChain;

struct Pipeline {
    chain: Arc<SimulatedChain>,
    state: Arc<SharedPoolState>,
    cache: Arc<TickRangeCache>,
    refresher: CacheRefresher,
    sync: ProtocolSynchronizer<SimulatedChain>,
    manager: PositionManager<SimulatedChain>,
}

async fn pipeline(mode: RunMode) -> Pipeline {
    init_tracing();
    let chain = Arc::new(SimulatedChain::new(10));
    initialize_ticks(&chain, -20, 20, 10).await;
    chain.set_liquidity(1_000_000).await;

    let state = Arc::new(SharedPoolState::new(100));
    let cache = Arc::new(TickRangeCache::new(10, 20));
    let refresher = CacheRefresher::spawn(cache.clone(), chain.clone());
    let sync = ProtocolSynchronizer::new(
        chain.clone(),
        state.clone(),
        refresher.handle(),
        SyncConfig::default(),
        mode,
    );
    let manager = PositionManager::new(chain.clone(), state.clone(), cache.clone(), mode);

    Pipeline {
        chain,
        state,
        cache,
        refresher,
        sync,
        manager,
    }
}

fn range(lower: i32, upper: i32) -> TickRange {
    TickRange::new(lower, upper, 10).unwrap()
}

#[tokio::test]
async fn test_mint_triggers_full_refresh_and_open_reads_chain() {
    let mut p = pipeline(RunMode::Simulation).await;
    p.chain.push_swap(1, 5).await;
    p.chain
        .push_liquidity_event(LiquidityEventKind::Mint, 1, -10, 10)
        .await;
    p.chain.set_head(1).await;

    let outcome = p.sync.step().await.unwrap();
    assert_eq!(
        outcome,
        StepOutcome::Advanced {
            block: 1,
            tick: 5,
            refresh_queued: true
        }
    );
    assert_eq!(p.state.current_liquidity().await, Some(1_000_000));

    let handle = p.refresher.handle();
    handle.wait_for(1).await;
    assert_eq!(p.cache.len().await, 5);
    let queries = p.chain.tick_queries().await;

    let outcome = p.manager.open(range(-10, 10), Deposit::default()).await.unwrap();
    assert_eq!(outcome, OpenOutcome::Opened(0));
    // initialized boundaries are always read at the current block
    assert_eq!(p.chain.tick_queries().await, queries + 2);

    p.refresher.shutdown().await;
}

#[tokio::test]
async fn test_unchanged_tick_queues_no_refresh() {
    let mut p = pipeline(RunMode::Replay).await;
    p.chain.push_swap(1, 5).await;
    p.chain.set_head(1).await;
    assert!(matches!(
        p.sync.step().await.unwrap(),
        StepOutcome::Advanced {
            refresh_queued: true,
            ..
        }
    ));

    p.chain.push_swap(2, 5).await;
    p.chain.set_head(2).await;
    assert_eq!(
        p.sync.step().await.unwrap(),
        StepOutcome::Advanced {
            block: 2,
            tick: 5,
            refresh_queued: false
        }
    );

    p.chain.set_head(3).await;
    assert_eq!(
        p.sync.step().await.unwrap(),
        StepOutcome::NoSwaps { block: 3 }
    );
    assert_eq!(p.state.current_tick().await, Some(5));
    assert_eq!(p.state.snapshot(10).await.swaps.len(), 2);

    p.refresher.shutdown().await;
}

#[tokio::test]
async fn test_range_outside_window_falls_back_to_chain_and_discards() {
    let mut p = pipeline(RunMode::Simulation).await;
    p.chain.push_swap(1, 5).await;
    p.chain.set_head(1).await;
    p.sync.step().await.unwrap();
    p.refresher.handle().wait_for(1).await;

    let queries = p.chain.tick_queries().await;
    let outcome = p.manager.open(range(30, 50), Deposit::default()).await.unwrap();
    assert_eq!(outcome, OpenOutcome::Discarded);
    assert!(p.chain.tick_queries().await > queries);
    assert!(p.manager.positions().await.is_empty());

    let events = p.manager.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, LifecycleEventType::PositionDiscarded);

    p.refresher.shutdown().await;
}

#[tokio::test]
async fn test_fees_accrue_between_open_and_close() {
    let mut p = pipeline(RunMode::Replay).await;
    p.chain
        .set_fee_growth(FeeGrowthX128::new(U256::one() << 128, U256::one() << 128))
        .await;
    p.chain.push_swap(1, 5).await;
    p.chain.set_head(1).await;
    p.sync.step().await.unwrap();

    p.manager.open(range(-10, 10), Deposit::default()).await.unwrap();
    let liquidity = p.manager.position(0).await.unwrap().liquidity();

    p.chain
        .set_fee_growth(FeeGrowthX128::new(U256::from(3u8) << 128, U256::from(2u8) << 128))
        .await;
    p.chain.push_swap(2, 5).await;
    p.chain.set_head(2).await;
    p.sync.step().await.unwrap();

    let CloseOutcome::Closed(record) = p.manager.close(0).await.unwrap() else {
        panic!("expected a performance record");
    };
    assert_eq!(record.closed_at_block, 2);
    assert!((record.accumulated_fees_1 - liquidity).abs() < 1e-9 * liquidity);
    assert!(record.accumulated_fees_0 > record.accumulated_fees_1);

    let stats = p.manager.aggregate_stats().await;
    assert_eq!(stats.closed_positions, 1);
    assert_eq!(stats.open_positions, 0);

    p.refresher.shutdown().await;
}
