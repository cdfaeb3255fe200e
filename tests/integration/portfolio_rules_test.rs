//! Portfolio-wide rules applied across a full cycle

use crate::common::*;
use basket_trader::config::Config;
use basket_trader::decision::{Action, Decision, RejectReason, ValidatorOutcome};
use basket_trader::ledger::{InMemoryLedger, Trade};
use basket_trader::market::MarketSnapshot;
use basket_trader::orchestrator::{CycleOrchestrator, CycleSummary};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn basket(symbols: &[&str]) -> Config {
    let mut config = config();
    config.universe.symbols = symbols.iter().map(|s| s.to_string()).collect();
    config
}

async fn cycle(
    config: &Config,
    trades: Vec<Trade>,
    snapshots: Vec<MarketSnapshot>,
) -> CycleSummary {
    let ledger = InMemoryLedger::from_trades(trades).unwrap();
    let market = market(snapshots).await;
    let orchestrator =
        CycleOrchestrator::new(config, Arc::new(ledger), market.clone(), market).unwrap();
    orchestrator.run_cycle_at(now()).await.unwrap()
}

fn rejected(decision: &Decision) -> &[RejectReason] {
    match &decision.outcome {
        ValidatorOutcome::Rejected { reasons } => reasons,
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unpriced_position_counts_toward_exposure() {
    let mut config = basket(&["BTCUSD", "ETHUSD"]);
    config.universe.capital = dec!(10000);
    config.risk.max_position_pct = dec!(100);

    // ETHUSD has no snapshot; its 3500 cost basis still counts
    let summary = cycle(
        &config,
        vec![
            buy("BTCUSD", dec!(0.1), dec!(40000), 0),
            buy("ETHUSD", dec!(1), dec!(3500), 1),
        ],
        vec![bullish_snapshot("BTCUSD", dec!(40000))],
    )
    .await;

    assert!(summary.report.partial);
    assert_eq!(summary.report.total_current_value, dec!(4000));
    assert_eq!(summary.report.exposure_value(), dec!(7500));

    // 4000 + 3500 + 4000 of 10000 equity
    let btc = summary.decision("BTCUSD").unwrap();
    assert_eq!(btc.action, Action::Hold);
    assert_eq!(
        rejected(btc),
        &[RejectReason::ExposureLimit {
            proposed_pct: Some(dec!(115)),
            max_pct: dec!(80)
        }]
    );
}

#[tokio::test]
async fn test_portfolio_stop_loss_exits_everything() {
    let summary = cycle(
        &config(),
        vec![buy("BTCUSD", dec!(1), dec!(100), 0)],
        vec![
            bullish_snapshot("BTCUSD", dec!(85)),
            bullish_snapshot("ETHUSD", dec!(2500)),
            bullish_snapshot("LINKUSD", dec!(100)),
        ],
    )
    .await;

    let btc = summary.decision("BTCUSD").unwrap();
    assert_eq!(btc.action, Action::Sell);
    assert_eq!(btc.outcome, ValidatorOutcome::Valid);
    assert!(btc
        .explanation
        .notes
        .iter()
        .any(|n| n.starts_with("BUY overridden to SELL: portfolio stop-loss")));

    for symbol in ["ETHUSD", "LINKUSD"] {
        let decision = summary.decision(symbol).unwrap();
        assert_eq!(decision.action, Action::Hold);
        assert!(decision
            .explanation
            .notes
            .iter()
            .any(|n| n.starts_with("BUY overridden to HOLD")));
    }
}

#[tokio::test]
async fn test_loss_above_portfolio_stop_keeps_signals() {
    // -2 of 98 is about -2%
    let summary = cycle(
        &config(),
        vec![buy("BTCUSD", dec!(1), dec!(100), 0)],
        vec![
            bullish_snapshot("BTCUSD", dec!(98)),
            bullish_snapshot("ETHUSD", dec!(2500)),
            bullish_snapshot("LINKUSD", dec!(100)),
        ],
    )
    .await;

    assert_eq!(summary.decision("ETHUSD").unwrap().action, Action::Buy);
    assert_eq!(summary.decision("BTCUSD").unwrap().action, Action::Buy);
}

#[tokio::test]
async fn test_total_quantity_cap() {
    let mut config = config();
    config.risk.max_total_quantity = Some(dec!(1));

    let summary = cycle(
        &config,
        vec![buy("BTCUSD", dec!(0.95), dec!(100), 0)],
        vec![
            snapshot("BTCUSD", dec!(100)),
            snapshot("ETHUSD", dec!(2500)),
            bullish_snapshot("LINKUSD", dec!(100)),
        ],
    )
    .await;

    let link = summary.decision("LINKUSD").unwrap();
    assert_eq!(link.action, Action::Hold);
    assert_eq!(
        rejected(link),
        &[RejectReason::TotalQuantityLimit {
            proposed: dec!(1.05),
            max: dec!(1)
        }]
    );
}

#[tokio::test]
async fn test_sell_held_until_it_clears_fees() {
    let mut config = basket(&["BTCUSD"]);
    config.risk.fee_rate = Some(dec!(0.005));
    let trades = || vec![buy("BTCUSD", dec!(1), dec!(100), 0)];

    // 0.1 sold at 100.5: 0.05 gross against 0.10025 in fees
    let summary = cycle(&config, trades(), vec![bearish_snapshot("BTCUSD", dec!(100.5))]).await;
    let btc = summary.decision("BTCUSD").unwrap();
    assert_eq!(btc.action, Action::Hold);
    assert_eq!(
        rejected(btc),
        &[RejectReason::UnprofitableSell {
            net_pnl: dec!(-0.05025)
        }]
    );

    let summary = cycle(&config, trades(), vec![bearish_snapshot("BTCUSD", dec!(110))]).await;
    let btc = summary.decision("BTCUSD").unwrap();
    assert_eq!(btc.action, Action::Sell);
    assert_eq!(btc.outcome, ValidatorOutcome::Valid);
}

#[tokio::test]
async fn test_stop_loss_sell_ignores_fees() {
    let mut config = basket(&["BTCUSD"]);
    config.risk.fee_rate = Some(dec!(0.005));
    // -5% trips the single-position stop but not the -10% portfolio stop
    let summary = cycle(
        &config,
        vec![buy("BTCUSD", dec!(1), dec!(100), 0)],
        vec![bearish_snapshot("BTCUSD", dec!(95))],
    )
    .await;

    let btc = summary.decision("BTCUSD").unwrap();
    assert_eq!(btc.action, Action::Sell);
    assert_eq!(btc.outcome, ValidatorOutcome::Valid);
}
