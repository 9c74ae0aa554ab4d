//! Token identities and the INPUT/OUTPUT slot mapping.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Immutable token identity, loaded once from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address:  Address,
    pub symbol:   String,
    pub name:     String,
    pub decimals: u8,
}

/// Which configured token is being sold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradeDirection {
    /// Sell token A, receive token B.
    #[default]
    AToB,
    /// Sell token B, receive token A.
    BToA,
}

impl TradeDirection {
    /// The opposite direction.
    pub fn toggled(self) -> Self {
        match self {
            Self::AToB => Self::BToA,
            Self::BToA => Self::AToB,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AToB => "A → B",
            Self::BToA => "B → A",
        }
    }
}

/// Static mapping from (direction, slot) to token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDirectory {
    token_a: Token,
    token_b: Token,
}

impl TokenDirectory {
    pub fn new(token_a: Token, token_b: Token) -> Self {
        Self { token_a, token_b }
    }

    pub fn token_a(&self) -> &Token {
        &self.token_a
    }

    pub fn token_b(&self) -> &Token {
        &self.token_b
    }

    /// Token in the INPUT slot for `direction`.
    pub fn input(&self, direction: TradeDirection) -> &Token {
        match direction {
            TradeDirection::AToB => &self.token_a,
            TradeDirection::BToA => &self.token_b,
        }
    }

    /// Token in the OUTPUT slot for `direction`.
    pub fn output(&self, direction: TradeDirection) -> &Token {
        self.input(direction.toggled())
    }
}
