use thiserror::Error;

/// Errors reported by a chain client.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport or node failure.
    #[error("rpc call failed: {0}")]
    Rpc(String),
    /// Wallet cannot cover a mint.
    #[error("insufficient balance of token{token}: need {required}, have {available}")]
    InsufficientBalance {
        /// Token index, 0 or 1.
        token: u8,
        /// Amount the mint needs.
        required: f64,
        /// Amount held.
        available: f64,
    },
    /// Operation not offered by this client.
    #[error("{0} is not supported by this client")]
    Unsupported(&'static str),
    /// A recorded event row could not be parsed.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
    /// Reading a recording failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
