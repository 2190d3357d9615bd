//! Versioned exchange address catalog used to classify counterparties as
//! deposit/withdrawal/bridge/router flows.
//!
//! The catalog is a versioned data asset: addresses drift (a hot wallet is
//! retired, a new one spun up) and a stale catalog silently mis-tags
//! history. Every classified Trade stores the `catalog_version` it was
//! tagged under so a later re-tag job can target exactly the trades
//! classified under a stale version instead of re-running the whole
//! history.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressLabel {
    ExchangeDeposit,
    ExchangeWithdrawal,
    Bridge,
    DexRouter,
}

pub struct ExchangeAddressCatalog {
    version: i32,
    entries: HashMap<String, AddressLabel>,
}

impl ExchangeAddressCatalog {
    pub fn new(version: i32, entries: HashMap<String, AddressLabel>) -> Self {
        Self { version, entries }
    }

    /// Loaded at collector startup. In a full deployment this reads a
    /// versioned table or config bundle; the seed set here covers the
    /// well-known router/bridge addresses collectors need to classify
    /// without a network round-trip on every tick.
    pub fn seed() -> Self {
        let mut entries = HashMap::new();
        entries.insert("0x1111111254eeb25477b68fb85ed929f73a960582".to_string(), AddressLabel::DexRouter); // 1inch
        entries.insert("0x7a250d5630b4cf539739df2c5dacb4c659f2488d".to_string(), AddressLabel::DexRouter); // Uniswap V2 router
        entries.insert("0xe592427a0aece92de3edee1f18e0157c05861564".to_string(), AddressLabel::DexRouter); // Uniswap V3 router
        Self::new(1, entries)
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn classify(&self, address: &str) -> Option<AddressLabel> {
        self.entries.get(&address.to_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_router_classified() {
        let catalog = ExchangeAddressCatalog::seed();
        assert_eq!(
            catalog.classify("0x7a250d5630b4cf539739df2c5dacb4c659f2488d"),
            Some(AddressLabel::DexRouter)
        );
    }

    #[test]
    fn unknown_address_is_unclassified() {
        let catalog = ExchangeAddressCatalog::seed();
        assert_eq!(catalog.classify("0xdeadbeef"), None);
    }

    #[test]
    fn classification_is_case_insensitive() {
        let catalog = ExchangeAddressCatalog::seed();
        assert_eq!(
            catalog.classify("0x7A250D5630B4CF539739DF2C5DACB4C659F2488D"),
            Some(AddressLabel::DexRouter)
        );
    }
}
