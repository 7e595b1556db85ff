//! Execution errors.

use thiserror::Error;
use v3lp_domain::error::MathError;
use v3lp_protocols::error::ChainError;

/// Errors raised by the synchronizer, lifecycle manager and scheduler.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A boundary tick of the range has no on-chain state.
    #[error("range [{lower}, {upper}) is not initialized at block {block}")]
    RangeNotInitialized {
        /// Lower tick.
        lower: i32,
        /// Upper tick.
        upper: i32,
        /// Block queried.
        block: u64,
    },
    /// The wallet cannot cover the mint.
    #[error("insufficient balance of token{token}: need {required}, have {available}")]
    InsufficientBalance {
        /// Token index, 0 or 1.
        token: u8,
        /// Amount the mint needs.
        required: f64,
        /// Amount held.
        available: f64,
    },
    /// A chain call failed.
    #[error("chain call failed: {0}")]
    Chain(ChainError),
    /// Position math rejected its inputs.
    #[error(transparent)]
    Math(#[from] MathError),
    /// The index is not in the open set.
    #[error("position {0} is not open")]
    PositionNotOpen(usize),
    /// No block has been synchronized yet.
    #[error("no block has been observed yet")]
    NoBlockObserved,
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<ChainError> for ExecutionError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InsufficientBalance {
                token,
                required,
                available,
            } => ExecutionError::InsufficientBalance {
                token,
                required,
                available,
            },
            other => ExecutionError::Chain(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_errors_surface_directly() {
        let err: ExecutionError = ChainError::InsufficientBalance {
            token: 1,
            required: 2.0,
            available: 1.0,
        }
        .into();
        assert!(matches!(err, ExecutionError::InsufficientBalance { token: 1, .. }));

        let err: ExecutionError = ChainError::Rpc("timeout".to_string()).into();
        assert!(matches!(err, ExecutionError::Chain(ChainError::Rpc(_))));
        assert_eq!(err.to_string(), "chain call failed: rpc call failed: timeout");
    }
}
