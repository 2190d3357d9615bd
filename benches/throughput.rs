//! Throughput benchmarks for bulk operations: the shapes the scheduler's
//! nightly metrics rebuild and the API's list/filter handlers pay at scale.
//!
//! Run with: `cargo bench --bench throughput`

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use whale_tracker::core::types::{
    Chain, Holding, Trade, TradeDirection, TradeSource, Whale, WhaleClassification,
};
use whale_tracker::metrics::accounting::Accountant;

fn trade(whale_id: Uuid, direction: TradeDirection, base_amount: Decimal, usd_notional: Option<Decimal>) -> Trade {
    Trade {
        id: Uuid::new_v4(),
        whale_id,
        timestamp: Utc::now(),
        source: TradeSource::Onchain,
        platform: "uniswap_v3".to_string(),
        direction,
        base_asset: "WETH".to_string(),
        quote_asset: Some("USDC".to_string()),
        base_amount,
        quote_amount: Decimal::ZERO,
        usd_notional,
        realized_pnl_usd: None,
        realized_pnl_percent: None,
        open_price: None,
        close_price: None,
        tx_hash: None,
        catalog_version: Some(1),
    }
}

/// A short, fixed-length trade history for one whale: a deposit plus a
/// handful of alternating buy/sell trades.
fn generate_whale_history(whale_id: Uuid, rng: &mut impl Rng) -> Vec<Trade> {
    let mut trades = Vec::with_capacity(21);
    trades.push(trade(whale_id, TradeDirection::Deposit, Decimal::ZERO, Some(Decimal::from(rng.gen_range(10_000..1_000_000)))));

    for i in 0..20 {
        let price = Decimal::from(rng.gen_range(1800..2200));
        if i % 2 == 0 {
            trades.push(trade(whale_id, TradeDirection::Buy, Decimal::ONE, Some(price)));
        } else {
            trades.push(trade(whale_id, TradeDirection::Sell, Decimal::NEGATIVE_ONE, Some(price)));
        }
    }
    trades
}

fn generate_whale_batch(count: usize) -> Vec<Whale> {
    let mut rng = rand::thread_rng();
    let classifications = [
        WhaleClassification::Unclassified,
        WhaleClassification::Holder,
        WhaleClassification::Trader,
        WhaleClassification::HolderTrader,
    ];
    let chains = [Chain::Evm, Chain::Utxo, Chain::Perp];

    (0..count)
        .map(|i| Whale {
            id: Uuid::new_v4(),
            chain: chains[i % chains.len()],
            address: format!("0x{:040x}", i),
            classification: classifications[rng.gen_range(0..classifications.len())],
            labels: vec!["retrieved".to_string()],
            first_seen: Utc::now(),
            last_active: Utc::now(),
        })
        .collect()
}

/// Benchmark replaying each whale's own trade history through a fresh
/// `Accountant` during a nightly metrics rebuild sweep.
fn bench_multi_whale_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_whale_replay");

    for whale_count in [10, 50, 100, 500, 1000].iter() {
        let mut rng = rand::thread_rng();
        let histories: Vec<Vec<Trade>> = (0..*whale_count)
            .map(|_| generate_whale_history(Uuid::new_v4(), &mut rng))
            .collect();

        group.throughput(Throughput::Elements(*whale_count as u64));
        group.bench_with_input(
            BenchmarkId::new("rebuild_all", whale_count),
            &histories,
            |b, histories| {
                b.iter(|| {
                    let rois: Vec<Decimal> = histories
                        .iter()
                        .map(|trades| {
                            let mut acct = Accountant::new();
                            for t in trades {
                                acct.apply(t);
                            }
                            acct.roi_percent(Decimal::ZERO)
                        })
                        .collect();
                    black_box(rois)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark bulk JSON serialization of a page of trades (the
/// `/wallets/:chain/:address/trades` response body).
fn bench_trade_batch_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("trade_batch_serialization");
    let whale_id = Uuid::new_v4();

    for count in [10, 50, 100, 500].iter() {
        let mut rng = rand::thread_rng();
        let trades: Vec<Trade> = (0..*count)
            .map(|i| {
                let price = Decimal::from(rng.gen_range(1800..2200));
                let direction = if i % 2 == 0 { TradeDirection::Buy } else { TradeDirection::Sell };
                trade(whale_id, direction, Decimal::ONE, Some(price))
            })
            .collect();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(
            BenchmarkId::new("serialize_page", count),
            &trades,
            |b, trades| b.iter(|| black_box(serde_json::to_string(trades).unwrap())),
        );
    }

    group.finish();
}

/// Benchmark bulk holdings-snapshot replacement (`holdings` table refresh
/// staged in memory before a batched upsert).
fn bench_holdings_snapshot_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("holdings_snapshot_replace");

    for holding_count in [10, 50, 100, 500, 1000].iter() {
        let whale_id = Uuid::new_v4();
        let mut rng = rand::thread_rng();

        let holdings: Vec<Holding> = (0..*holding_count)
            .map(|i| Holding {
                whale_id,
                asset: format!("asset_{}", i),
                chain: Chain::Evm,
                amount: Decimal::from(rng.gen_range(1..10_000)),
                usd_value: Some(Decimal::from(rng.gen_range(1..1_000_000))),
                portfolio_percent: Some(Decimal::new(rng.gen_range(1..10_000), 2)),
                updated_at: Utc::now(),
            })
            .collect();

        group.throughput(Throughput::Elements(*holding_count as u64));
        group.bench_with_input(
            BenchmarkId::new("stage_snapshot", holding_count),
            &holdings,
            |b, holdings| {
                b.iter(|| {
                    let mut staged: HashMap<String, Holding> = HashMap::new();
                    for holding in holdings {
                        staged.insert(holding.asset.clone(), holding.clone());
                    }
                    black_box(staged)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark the broadcaster's subscriber registry under bulk churn:
/// concurrent `DashMap` inserts as WebSocket clients connect.
fn bench_dashmap_bulk_updates(c: &mut Criterion) {
    use dashmap::DashMap;

    let mut group = c.benchmark_group("dashmap_bulk");

    for subscriber_count in [100, 500, 1000, 5000].iter() {
        let ids: Vec<Uuid> = (0..*subscriber_count).map(|_| Uuid::new_v4()).collect();

        group.throughput(Throughput::Elements(*subscriber_count as u64));
        group.bench_with_input(
            BenchmarkId::new("register_subscribers", subscriber_count),
            &ids,
            |b, ids| {
                b.iter(|| {
                    let registry: DashMap<Uuid, bool> = DashMap::new();
                    for id in ids {
                        registry.insert(*id, true);
                    }
                    black_box(registry)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark bulk unrealized-PnL recomputation over open positions (one
/// `Decimal` subtraction and multiplication per holding, every price tick).
fn bench_pnl_calculations(c: &mut Criterion) {
    let mut group = c.benchmark_group("pnl_calculations");

    for position_count in [10, 50, 100, 500, 1000].iter() {
        let mut rng = rand::thread_rng();

        let positions: Vec<(Decimal, Decimal, Decimal)> = (0..*position_count)
            .map(|_| {
                let entry = Decimal::new(rng.gen_range(30..70), 2);
                let current = Decimal::new(rng.gen_range(25..75), 2);
                let quantity = Decimal::new(rng.gen_range(10..1000), 0);
                (entry, current, quantity)
            })
            .collect();

        group.throughput(Throughput::Elements(*position_count as u64));
        group.bench_with_input(
            BenchmarkId::new("calculate_all", position_count),
            &positions,
            |b, positions| {
                b.iter(|| {
                    let pnls: Vec<Decimal> = positions
                        .iter()
                        .map(|(entry, current, qty)| (*current - *entry) * *qty)
                        .collect();
                    black_box(pnls)
                })
            },
        );
    }

    group.finish();
}

/// Benchmark the whale-list handler's Rust-side post-filter (classification
/// plus minimum ROI), run whenever the SQL-level filter isn't sufficient.
fn bench_whale_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("whale_filtering");

    for whale_count in [100, 500, 1000, 5000].iter() {
        let whales = generate_whale_batch(*whale_count);

        group.throughput(Throughput::Elements(*whale_count as u64));
        group.bench_with_input(
            BenchmarkId::new("filter_traders", whale_count),
            &whales,
            |b, whales| {
                b.iter(|| {
                    let filtered: Vec<_> = whales
                        .iter()
                        .filter(|w| {
                            matches!(w.classification, WhaleClassification::Trader | WhaleClassification::HolderTrader)
                        })
                        .collect();
                    black_box(filtered)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_multi_whale_replay,
    bench_trade_batch_serialization,
    bench_holdings_snapshot_replace,
    bench_dashmap_bulk_updates,
    bench_pnl_calculations,
    bench_whale_filtering,
);

criterion_main!(benches);
