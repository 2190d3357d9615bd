//! Latency benchmarks for the metrics engine's hot path: one FIFO
//! accounting pass per trade, run at the per-trade cost a live rebuild
//! pays for every whale on every tick.
//!
//! Run with: `cargo bench --bench latency`

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_decimal::Decimal;
use uuid::Uuid;

use whale_tracker::core::types::{Trade, TradeDirection, TradeSource};
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

/// A whale buying and selling the same asset back and forth, so every
/// close actually consumes a FIFO lot instead of hitting an empty book.
fn generate_trade_history(whale_id: Uuid, count: usize) -> Vec<Trade> {
    let mut trades = Vec::with_capacity(count + 1);
    trades.push(trade(whale_id, TradeDirection::Deposit, Decimal::ZERO, Some(Decimal::from(1_000_000))));

    for i in 0..count {
        let price = Decimal::from(1800 + (i % 400) as i64);
        if i % 2 == 0 {
            trades.push(trade(whale_id, TradeDirection::Buy, Decimal::ONE, Some(price)));
        } else {
            trades.push(trade(whale_id, TradeDirection::Sell, Decimal::NEGATIVE_ONE, Some(price)));
        }
    }
    trades
}

/// Benchmark a single `apply()` call in isolation, independent of history
/// length — the cost a live incremental update pays per newly-seen trade.
fn bench_accountant_apply_one(c: &mut Criterion) {
    let whale_id = Uuid::new_v4();
    let t = trade(whale_id, TradeDirection::Buy, Decimal::ONE, Some(Decimal::from(2000)));

    let mut group = c.benchmark_group("accountant_apply_one");
    group.throughput(Throughput::Elements(1));
    group.bench_function("buy", |b| {
        b.iter_batched(Accountant::new, |mut acct| black_box(acct.apply(black_box(&t))), criterion::BatchSize::SmallInput)
    });
    group.finish();
}

/// Benchmark a full rebuild pass over a whale's entire trade history.
fn bench_full_rebuild_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_rebuild_replay");
    let whale_id = Uuid::new_v4();

    for history_len in [10, 100, 1_000, 10_000].iter() {
        let trades = generate_trade_history(whale_id, *history_len);

        group.throughput(Throughput::Elements(trades.len() as u64));
        group.bench_with_input(BenchmarkId::new("replay", history_len), &trades, |b, trades| {
            b.iter(|| {
                let mut acct = Accountant::new();
                for t in trades {
                    black_box(acct.apply(t));
                }
                black_box(acct.roi_percent(Decimal::ZERO))
            })
        });
    }

    group.finish();
}

/// Benchmark trade JSON serialization (the wire format for `TradeResponse`).
fn bench_trade_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("trade_serialization");
    let t = trade(Uuid::new_v4(), TradeDirection::Buy, Decimal::ONE, Some(Decimal::from(1800)));

    group.throughput(Throughput::Elements(1));
    group.bench_function("trade_to_json", |b| b.iter(|| black_box(serde_json::to_string(black_box(&t)))));

    let json = serde_json::to_string(&t).unwrap();
    group.bench_function("json_to_trade", |b| b.iter(|| black_box(serde_json::from_str::<Trade>(black_box(&json)))));

    group.finish();
}

/// Benchmark UUID generation (whale ids, trade ids, session ids).
fn bench_uuid_generation(c: &mut Criterion) {
    c.bench_function("uuid_v4", |b| b.iter(|| black_box(Uuid::new_v4())));
}

/// Benchmark Decimal arithmetic underlying every PnL/ROI calculation.
fn bench_decimal_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("decimal_arithmetic");

    let val_a = Decimal::new(12345, 4); // 1.2345
    let val_b = Decimal::new(67890, 4); // 6.7890

    group.bench_function("addition", |bencher| bencher.iter(|| black_box(black_box(val_a) + black_box(val_b))));
    group.bench_function("multiplication", |bencher| bencher.iter(|| black_box(black_box(val_a) * black_box(val_b))));
    group.bench_function("division", |bencher| bencher.iter(|| black_box(black_box(val_a) / black_box(val_b))));
    group.bench_function("comparison", |bencher| bencher.iter(|| black_box(black_box(val_a) > black_box(val_b))));

    group.finish();
}

/// Benchmark opaque trade-cursor encode/decode (pagination hot path).
fn bench_cursor_roundtrip(c: &mut Criterion) {
    use whale_tracker::core::db::cursor::Cursor;

    let mut group = c.benchmark_group("cursor_roundtrip");
    let cursor = Cursor { timestamp: Utc::now(), id: Uuid::new_v4() };

    group.bench_function("encode", |b| b.iter(|| black_box(cursor.encode())));

    let encoded = cursor.encode();
    group.bench_function("decode", |b| b.iter(|| black_box(Cursor::decode(black_box(&encoded)))));

    group.finish();
}

/// Benchmark concurrent DashMap operations (the broadcaster's subscriber
/// registry, and the backfill orchestrator's per-whale progress map).
fn bench_dashmap_operations(c: &mut Criterion) {
    use dashmap::DashMap;

    let mut group = c.benchmark_group("dashmap");

    let map: DashMap<Uuid, String> = DashMap::new();
    for _ in 0..1000 {
        let id = Uuid::new_v4();
        map.insert(id, format!("value_{}", id));
    }
    let known_key = *map.iter().next().unwrap().key();

    group.bench_function("insert", |b| {
        b.iter(|| {
            let id = Uuid::new_v4();
            map.insert(id, black_box(format!("value_{}", id)));
        })
    });

    group.bench_function("get", |b| b.iter(|| black_box(map.get(&known_key))));
    group.bench_function("contains", |b| b.iter(|| black_box(map.contains_key(&known_key))));

    group.finish();
}

criterion_group!(
    benches,
    bench_accountant_apply_one,
    bench_full_rebuild_replay,
    bench_trade_serialization,
    bench_uuid_generation,
    bench_decimal_arithmetic,
    bench_cursor_roundtrip,
    bench_dashmap_operations,
);

criterion_main!(benches);
