//! Source network enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked source network. Static enumeration — new chains are a code
/// change, not configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Evm,
    Utxo,
    Perp,
}

impl Chain {
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Evm => "Ethereum",
            Chain::Utxo => "Bitcoin",
            Chain::Perp => "Hyperliquid",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Evm => "evm",
            Chain::Utxo => "utxo",
            Chain::Perp => "perp",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Chain {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evm" => Ok(Chain::Evm),
            "utxo" => Ok(Chain::Utxo),
            "perp" => Ok(Chain::Perp),
            other => Err(crate::Error::DecodeError(format!("unknown chain: {other}"))),
        }
    }
}
