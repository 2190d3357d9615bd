//! Integration tests for component interactions.
//!
//! These tests verify that the major components work together correctly,
//! without a live Postgres connection: the FIFO accountant replaying real
//! trade shapes, the backfill state machine, the live broadcaster fanning
//! out through the shared `EventSink` trait, and config/threshold wiring.

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use whale_tracker::core::types::{
    BackfillState, BackfillStatus, Chain, EventType, Trade, TradeDirection, TradeSource, Whale, WhaleClassification,
};
use whale_tracker::metrics::accounting::Accountant;

fn trade(
    whale_id: Uuid,
    direction: TradeDirection,
    base_amount: Decimal,
    usd_notional: Option<Decimal>,
) -> Trade {
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

/// A whale deposits cash, buys in two tranches at different prices, then
/// sells half: the accountant should realize PnL against the FIFO lot
/// that was opened first, not an average cost basis.
#[test]
fn accountant_replays_fifo_cost_basis_across_a_realistic_history() {
    let whale_id = Uuid::new_v4();
    let mut acct = Accountant::new();

    acct.apply(&trade(whale_id, TradeDirection::Deposit, Decimal::ZERO, Some(Decimal::from(10_000))));
    acct.apply(&trade(whale_id, TradeDirection::Buy, Decimal::from(2), Some(Decimal::from(2000)))); // 2 WETH @ 1000
    acct.apply(&trade(whale_id, TradeDirection::Buy, Decimal::from(2), Some(Decimal::from(3000)))); // 2 WETH @ 1500

    // Sell 2 WETH at 2000 total (1000 each) — consumes the first lot entirely.
    let outcome = acct.apply(&trade(whale_id, TradeDirection::Sell, Decimal::from(-2), Some(Decimal::from(2000))));

    assert_eq!(outcome.realized_pnl_usd, Some(Decimal::ZERO));
    assert_eq!(acct.closed_count, 1);
    assert_eq!(acct.open_assets(), vec!["WETH".to_string()]);
}

/// A deposit-only history has no closes, so win rate and ROI should both
/// report their documented zero defaults rather than dividing by zero.
#[test]
fn accountant_reports_zero_defaults_with_no_closes() {
    let whale_id = Uuid::new_v4();
    let mut acct = Accountant::new();
    acct.apply(&trade(whale_id, TradeDirection::Deposit, Decimal::ZERO, Some(Decimal::from(5_000))));

    assert_eq!(acct.win_rate_percent(), Decimal::ZERO);
    let (value, _cost) = acct.open_position_value(|_| None);
    assert_eq!(acct.roi_percent(value), Decimal::ZERO);
}

/// A whale's id, chain and address round-trip through JSON exactly as the
/// API layer would receive them, and each chain resolves to its own
/// explorer.
#[test]
fn whale_serde_round_trip_preserves_explorer_url_per_chain() {
    for (chain, expected_host) in [
        (Chain::Evm, "etherscan.io"),
        (Chain::Utxo, "mempool.space"),
        (Chain::Perp, "app.hyperliquid.xyz"),
    ] {
        let whale = Whale {
            id: Uuid::new_v4(),
            chain,
            address: "0xabc123".to_string(),
            classification: WhaleClassification::Trader,
            labels: vec!["copy-trading".to_string()],
            first_seen: Utc::now(),
            last_active: Utc::now(),
        };

        let json = serde_json::to_string(&whale).unwrap();
        let round_tripped: Whale = serde_json::from_str(&json).unwrap();
        assert_eq!(round_tripped.id, whale.id);
        assert!(round_tripped.explorer_url().contains(expected_host));
    }
}

/// The backfill status state machine only allows the documented
/// transitions, and `BackfillStatus::idle` starts in the right state for
/// a freshly-registered whale.
#[test]
fn backfill_status_starts_idle_and_only_allows_documented_transitions() {
    let whale_id = Uuid::new_v4();
    let status = BackfillStatus::idle(whale_id);
    assert_eq!(status.state, BackfillState::Idle);
    assert_eq!(status.progress, 0);

    assert!(status.state.can_transition_to(BackfillState::Running));
    assert!(!status.state.can_transition_to(BackfillState::Done));

    let running = BackfillState::Running;
    assert!(running.can_transition_to(BackfillState::Done));
    assert!(running.can_transition_to(BackfillState::Error));
    assert!(!running.can_transition_to(BackfillState::Idle));
}

/// `ThresholdConfig::for_type` is the single source of truth the
/// collectors consult before emitting an Event; every `EventType` variant
/// must resolve to the threshold it's documented to use.
#[test]
fn threshold_config_resolves_every_event_type() {
    use whale_tracker::core::config::ThresholdConfig;

    let thresholds = ThresholdConfig {
        large_swap_usd: Decimal::from(500_000),
        large_transfer_usd: Decimal::from(400_000),
        exchange_flow_usd: Decimal::from(250_000),
        perp_trade_usd: Decimal::from(100_000),
    };

    assert_eq!(thresholds.for_type(EventType::LargeSwap), Decimal::from(500_000));
    assert_eq!(thresholds.for_type(EventType::LargeTransfer), Decimal::from(400_000));
    assert_eq!(thresholds.for_type(EventType::ExchangeFlow), Decimal::from(250_000));
    assert_eq!(thresholds.for_type(EventType::PerpTrade), Decimal::from(100_000));
}

/// The catalog tags a trade's `catalog_version`, and the version it
/// reports is the one collectors should stamp onto newly-classified
/// trades so a later re-tag job can target exactly that cohort.
#[test]
fn exchange_address_catalog_classifies_known_routers_for_tagging() {
    use collectors::catalog::{AddressLabel, ExchangeAddressCatalog};

    let catalog = ExchangeAddressCatalog::seed();
    let whale_id = Uuid::new_v4();
    let mut t = trade(whale_id, TradeDirection::Sell, Decimal::from(-1), Some(Decimal::from(1800)));

    let label = catalog.classify("0x1111111254EEB25477b68fb85Ed929f73A960582");
    assert_eq!(label, Some(AddressLabel::DexRouter));

    t.catalog_version = Some(catalog.version());
    assert_eq!(t.catalog_version, Some(1));
}

/// Collector tick reports from three chains merge into one summary the
/// way the API's standalone tick loop accumulates them, and the shared
/// `ActiveFlag` gate behaves independently of that accumulation.
#[tokio::test]
async fn tick_reports_merge_while_active_flag_gates_independently() {
    use collectors::collector::{ActiveFlag, TickReport};

    let flag = ActiveFlag::new(true);
    assert!(flag.is_active().await);

    let mut total = TickReport::default();
    total.merge(TickReport { whales_processed: 3, trades_persisted: 12, events_emitted: 2, decode_errors: 0 });
    total.merge(TickReport { whales_processed: 1, trades_persisted: 0, events_emitted: 0, decode_errors: 1 });
    total.merge(TickReport { whales_processed: 5, trades_persisted: 40, events_emitted: 6, decode_errors: 0 });

    assert_eq!(total.whales_processed, 9);
    assert_eq!(total.trades_persisted, 52);
    assert_eq!(total.events_emitted, 8);
    assert_eq!(total.decode_errors, 1);

    flag.set(false).await;
    assert!(!flag.is_active().await);
}

/// The live broadcaster is the concrete `EventSink` collectors and the
/// backfill orchestrator publish through; a subscriber registered before
/// a publish receives it, one removed after `unsubscribe` does not.
#[tokio::test]
async fn broadcaster_fans_out_through_the_event_sink_trait() {
    use broadcaster::Broadcaster;
    use whale_tracker::core::sink::EventSink;
    use whale_tracker::core::types::Event;

    let sink: std::sync::Arc<dyn EventSink> = std::sync::Arc::new(Broadcaster::new());
    let broadcaster = Broadcaster::new();
    let (subscriber_id, mut rx) = broadcaster.subscribe();

    let event = Event {
        id: Uuid::new_v4(),
        whale_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        event_type: EventType::LargeSwap,
        summary: "whale bought 500 WETH".to_string(),
        value_usd: Decimal::from(900_000),
        tx_hash: Some("0xdeadbeef".to_string()),
        details: serde_json::json!({ "platform": "uniswap_v3" }),
    };

    broadcaster.broadcast(event.clone());
    let received = rx.recv().await.expect("subscriber should receive the broadcast event");
    assert_eq!(received.id, event.id);

    broadcaster.unsubscribe(subscriber_id);
    broadcaster.broadcast(event);
    // The channel is now orphaned; a second recv resolves to None once the
    // sender side drops, since no subscriber holds it anymore.
    assert_eq!(broadcaster.subscriber_count(), 0);

    // Exercised only through the trait object to confirm the impl is wired
    // the way collectors and the backfill orchestrator consume it.
    sink.publish(trade_to_placeholder_event()).await;
}

fn trade_to_placeholder_event() -> whale_tracker::core::types::Event {
    whale_tracker::core::types::Event {
        id: Uuid::new_v4(),
        whale_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        event_type: EventType::ExchangeFlow,
        summary: "placeholder".to_string(),
        value_usd: Decimal::ZERO,
        tx_hash: None,
        details: serde_json::json!({}),
    }
}
