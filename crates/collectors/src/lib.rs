//! Source Collectors
//!
//! Periodic, checkpointed extraction of trades/events/holdings for tracked
//! whales across the EVM, UTXO and PERP sources, normalized to the
//! canonical types in `whale-core`.

pub mod catalog;
pub mod collector;
pub mod esplora;
pub mod evm;
pub mod perp;
pub mod perp_client;
pub mod rpc;
pub mod utxo;

pub use catalog::{AddressLabel, ExchangeAddressCatalog};
pub use collector::{ActiveFlag, Collector, TickReport};
pub use evm::EvmCollector;
pub use perp::PerpCollector;
pub use utxo::UtxoCollector;
