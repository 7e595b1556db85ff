//! Lifecycle events for position tracking.

use serde::{Deserialize, Serialize};

/// Type of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEventType {
    /// Position was opened.
    PositionOpened,
    /// Position was closed with a performance record.
    PositionClosed,
    /// Position was dropped because a boundary tick was uninitialized.
    PositionDiscarded,
}

/// A lifecycle event for a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Event ID.
    pub id: String,
    /// Event type.
    pub event_type: LifecycleEventType,
    /// Position index, absent for opens discarded before a position existed.
    pub position_index: Option<usize>,
    /// Block the event happened at.
    pub block: u64,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Event-specific data.
    pub data: EventData,
}

impl LifecycleEvent {
    /// Creates a new lifecycle event.
    pub fn new(position_index: Option<usize>, block: u64, data: EventData) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: data.event_type(),
            position_index,
            block,
            timestamp: chrono::Utc::now(),
            data,
        }
    }
}

/// Event-specific data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventData {
    /// Position opened data.
    PositionOpened(PositionOpenedData),
    /// Position closed data.
    PositionClosed(PositionClosedData),
    /// Position discarded data.
    PositionDiscarded(PositionDiscardedData),
}

impl EventData {
    /// Type of the event carrying this data.
    pub fn event_type(&self) -> LifecycleEventType {
        match self {
            EventData::PositionOpened(_) => LifecycleEventType::PositionOpened,
            EventData::PositionClosed(_) => LifecycleEventType::PositionClosed,
            EventData::PositionDiscarded(_) => LifecycleEventType::PositionDiscarded,
        }
    }
}

/// Data for position opened event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedData {
    /// Lower tick.
    pub tick_lower: i32,
    /// Upper tick.
    pub tick_upper: i32,
    /// Pool tick at open.
    pub tick: i32,
    /// Liquidity `L`.
    pub liquidity: f64,
    /// Token0 committed.
    pub amount0: f64,
    /// Token1 committed.
    pub amount1: f64,
    /// Chain identifier, for live positions.
    pub external_id: Option<String>,
}

/// Data for position closed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClosedData {
    /// Pool tick at close.
    pub tick: i32,
    /// Token0 fees, in token1.
    pub fees0: f64,
    /// Token1 fees.
    pub fees1: f64,
    /// Value of holding the initial deposit.
    pub value_hold: f64,
    /// Value of the position.
    pub value_position: f64,
}

/// Data for position discarded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDiscardedData {
    /// Lower tick.
    pub tick_lower: i32,
    /// Upper tick.
    pub tick_upper: i32,
    /// Stage the position was dropped at.
    pub stage: DiscardStage,
}

/// When a position was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardStage {
    /// Before it was created.
    Open,
    /// While closing; no performance was recorded.
    Close,
}
