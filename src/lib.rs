//! Whale Tracker: wallet tracking, analytics and copy-trading pipeline
//! across EVM, UTXO and perp sources.
//!
//! This is the root crate that provides benchmark access to the internal
//! modules. For actual functionality, use the individual crates directly:
//!
//! - `whale-core`: core types, error taxonomy, config, database repositories
//! - `price-oracle`: spot and historical USD pricing
//! - `collectors`: per-chain ingestion (EVM, UTXO, perp)
//! - `metrics-engine`: cost-basis accounting and ROI rebuilds
//! - `backfill`: full-history backfill orchestration
//! - `broadcaster`: live event fan-out
//! - `scheduler`: classifier and periodic rebuild jobs
//! - `copier`: copy-trading backtests and shadow-live sessions
//! - `api-server`: REST/WebSocket API server

// Re-export for benchmarks
pub use copier as copy;
pub use metrics_engine as metrics;
pub use price_oracle as price;
pub use whale_core as core;
