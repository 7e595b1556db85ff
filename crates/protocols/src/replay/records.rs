//! Parsing of recorded event logs.

use crate::error::ChainError;
use primitive_types::U256;
use std::path::Path;
use std::str::FromStr;
use tracing::info;
use v3lp_domain::entities::{BlockRange, LiquidityEvent, LiquidityEventKind, SwapEvent};

const SWAP_COLUMNS: usize = 6;
const LIQUIDITY_COLUMNS: usize = 5;

/// All recorded events of one pool, each kind sorted by block.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    swaps: Vec<SwapEvent>,
    mints: Vec<LiquidityEvent>,
    burns: Vec<LiquidityEvent>,
}

impl EventLog {
    /// Creates a log from already parsed events.
    pub fn new(
        mut swaps: Vec<SwapEvent>,
        mut mints: Vec<LiquidityEvent>,
        mut burns: Vec<LiquidityEvent>,
    ) -> Self {
        swaps.sort_by_key(|e| e.block);
        mints.sort_by_key(|e| e.block);
        burns.sort_by_key(|e| e.block);
        Self {
            swaps,
            mints,
            burns,
        }
    }

    /// Parses the three recordings from their text.
    ///
    /// # Errors
    /// Returns `MalformedRecord` for the first row that does not parse.
    pub fn from_strs(swaps: &str, mints: &str, burns: &str) -> Result<Self, ChainError> {
        Ok(Self::new(
            parse_swaps(swaps)?,
            parse_liquidity_events(mints)?,
            parse_liquidity_events(burns)?,
        ))
    }

    /// Reads and parses the three recordings from disk.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read or a row does not parse.
    pub fn load(
        swaps: impl AsRef<Path>,
        mints: impl AsRef<Path>,
        burns: impl AsRef<Path>,
    ) -> Result<Self, ChainError> {
        let log = Self::from_strs(
            &std::fs::read_to_string(swaps.as_ref())?,
            &std::fs::read_to_string(mints.as_ref())?,
            &std::fs::read_to_string(burns.as_ref())?,
        )?;

        info!(
            swaps = log.swaps.len(),
            mints = log.mints.len(),
            burns = log.burns.len(),
            first_block = ?log.first_block(),
            last_block = ?log.last_block(),
            "Loaded event log"
        );

        Ok(log)
    }

    /// Earliest block with any event.
    pub fn first_block(&self) -> Option<u64> {
        [
            self.swaps.first().map(|e| e.block),
            self.mints.first().map(|e| e.block),
            self.burns.first().map(|e| e.block),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Latest block with any event.
    pub fn last_block(&self) -> Option<u64> {
        [
            self.swaps.last().map(|e| e.block),
            self.mints.last().map(|e| e.block),
            self.burns.last().map(|e| e.block),
        ]
        .into_iter()
        .flatten()
        .max()
    }

    /// Swaps within `range`.
    pub fn swaps_in(&self, range: BlockRange) -> &[SwapEvent] {
        slice_in(&self.swaps, range, |e| e.block)
    }

    /// Mints or burns within `range`.
    pub fn liquidity_events_in(
        &self,
        range: BlockRange,
        kind: LiquidityEventKind,
    ) -> &[LiquidityEvent] {
        let events = match kind {
            LiquidityEventKind::Mint => &self.mints,
            LiquidityEventKind::Burn => &self.burns,
        };
        slice_in(events, range, |e| e.block)
    }
}

fn slice_in<T>(events: &[T], range: BlockRange, block: impl Fn(&T) -> u64) -> &[T] {
    let start = events.partition_point(|e| block(e) <= range.after);
    let end = events.partition_point(|e| block(e) <= range.through);
    &events[start..end.max(start)]
}

/// Parses swap rows: `block, tick, liquidity, sqrt_price_x96, amount0, amount1`.
///
/// # Errors
/// Returns `MalformedRecord` for the first row that does not parse.
pub fn parse_swaps(text: &str) -> Result<Vec<SwapEvent>, ChainError> {
    rows(text, SWAP_COLUMNS)
        .map(|row| {
            let (line, fields) = row?;
            Ok(SwapEvent {
                block: field(line, &fields, 0)?,
                tick: field(line, &fields, 1)?,
                liquidity: field(line, &fields, 2)?,
                sqrt_price_x96: U256::from_dec_str(fields[3]).map_err(|e| {
                    ChainError::MalformedRecord {
                        line,
                        reason: format!("column 4: {e:?}"),
                    }
                })?,
                amount0: field(line, &fields, 4)?,
                amount1: field(line, &fields, 5)?,
            })
        })
        .collect()
}

/// Parses mint or burn rows: `block, tick_lower, tick_upper, amount0, amount1`.
///
/// # Errors
/// Returns `MalformedRecord` for the first row that does not parse.
pub fn parse_liquidity_events(text: &str) -> Result<Vec<LiquidityEvent>, ChainError> {
    rows(text, LIQUIDITY_COLUMNS)
        .map(|row| {
            let (line, fields) = row?;
            Ok(LiquidityEvent {
                block: field(line, &fields, 0)?,
                tick_lower: field(line, &fields, 1)?,
                tick_upper: field(line, &fields, 2)?,
                amount0: field(line, &fields, 3)?,
                amount1: field(line, &fields, 4)?,
            })
        })
        .collect()
}

/// Non-blank rows with their 1-based line number, split and trimmed.
fn rows(
    text: &str,
    columns: usize,
) -> impl Iterator<Item = Result<(usize, Vec<&str>), ChainError>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(move |(index, line)| {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != columns {
                return Err(ChainError::MalformedRecord {
                    line: index + 1,
                    reason: format!("expected {columns} columns, found {}", fields.len()),
                });
            }
            Ok((index + 1, fields))
        })
}

fn field<T: FromStr>(line: usize, fields: &[&str], column: usize) -> Result<T, ChainError>
where
    T::Err: std::fmt::Display,
{
    fields[column]
        .parse()
        .map_err(|e: T::Err| ChainError::MalformedRecord {
            line,
            reason: format!("column {}: {e}", column + 1),
        })
}
