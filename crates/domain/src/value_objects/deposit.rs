use serde::{Deserialize, Serialize};

/// A one-sided deposit used to size a new position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "token", content = "amount", rename_all = "lowercase")]
pub enum Deposit {
    /// Real amount of token0 to commit.
    Token0(f64),
    /// Real amount of token1 to commit.
    Token1(f64),
}

impl Deposit {
    pub fn amount(&self) -> f64 {
        match self {
            Deposit::Token0(amount) | Deposit::Token1(amount) => *amount,
        }
    }
}

impl Default for Deposit {
    fn default() -> Self {
        Deposit::Token1(1e18)
    }
}
