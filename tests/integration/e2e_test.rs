//! End-to-end orchestrator tests

use crate::common::*;
use basket_trader::decision::{Action, RejectReason, ValidatorOutcome};
use basket_trader::ledger::{InMemoryLedger, TradeLedger};
use basket_trader::market::{MarketSnapshot, Sentiment};
use basket_trader::orchestrator::{CycleError, CycleOrchestrator};
use basket_trader::profitability::SymbolStatus;
use rust_decimal::Decimal;
use basket_trader::sink::{JsonlDecisionSink, MemoryDecisionSink};
use chrono::Duration;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn basket_ledger() -> InMemoryLedger {
    InMemoryLedger::from_trades([
        buy("BTCUSD", dec!(0.2), dec!(58000), 0),
        buy("ETHUSD", dec!(3), dec!(2450), 1),
    ])
    .unwrap()
}

async fn basket_market() -> Arc<basket_trader::market::StaticMarketData> {
    market(vec![
        bullish_snapshot("BTCUSD", dec!(60000)),
        snapshot("ETHUSD", dec!(2500)),
        bullish_snapshot("LINKUSD", dec!(100)),
    ])
    .await
}

#[tokio::test]
async fn test_full_cycle() {
    let market = basket_market().await;
    let sink = MemoryDecisionSink::new();
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap()
    .with_sink(Arc::new(sink.clone()));

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    let symbols: Vec<_> = summary.decisions.iter().map(|d| d.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BTCUSD", "ETHUSD", "LINKUSD"]);
    assert_eq!(summary.degraded_count(), 0);

    let btc = summary.decision("BTCUSD").unwrap();
    assert_eq!(btc.action, Action::Buy);
    assert_eq!(btc.outcome, ValidatorOutcome::Valid);
    assert!(btc.is_actionable());
    assert_eq!(btc.technical_score, dec!(1));
    assert_eq!(btc.explanation.factors[0].factor, "technical");

    let eth = summary.decision("ETHUSD").unwrap();
    assert_eq!(eth.action, Action::Hold);
    assert_eq!(eth.outcome, ValidatorOutcome::Valid);
    assert!(eth.explanation.notes[0].starts_with("missing indicators"));

    let link = summary.decision("LINKUSD").unwrap();
    assert_eq!(link.action, Action::Buy);
    assert_eq!(link.risk_score, dec!(1));
    assert_eq!(link.confidence, dec!(1));

    // 0.2 * (60000 - 58000) + 3 * (2500 - 2450)
    assert_eq!(summary.report.total_unrealized_pnl, dec!(550));
    assert_eq!(summary.report.benchmark_return_pct, Some(dec!(2)));
    assert!(!summary.report.partial);
    assert_eq!(summary.started_at, now());

    let emitted = sink.decisions().await;
    assert_eq!(emitted, summary.decisions);
    assert!(emitted.iter().all(|d| d.cycle_id == summary.cycle_id));
}

#[tokio::test]
async fn test_missing_snapshot_degrades_only_that_symbol() {
    let market = basket_market().await;
    market.remove_snapshot("ETHUSD").await;
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    assert_eq!(summary.decisions.len(), 3);
    assert_eq!(summary.degraded_count(), 1);

    let eth = summary.decision("ETHUSD").unwrap();
    assert!(eth.is_degraded());
    assert_eq!(eth.action, Action::Hold);
    assert_eq!(eth.confidence, dec!(0));
    assert!(eth.explanation.notes[0].contains("Stale or missing snapshot"));

    assert!(summary.report.partial);
    assert_eq!(summary.report.degraded_symbols, vec!["ETHUSD".to_string()]);
    assert_eq!(summary.report.total_current_value, dec!(12000));
    assert_eq!(summary.decision("BTCUSD").unwrap().action, Action::Buy);
}

#[tokio::test]
async fn test_ledger_failure_abandons_cycle() {
    let market = basket_market().await;
    let sink = MemoryDecisionSink::new();
    let orchestrator =
        CycleOrchestrator::new(&config(), Arc::new(BrokenLedger), market.clone(), market)
            .unwrap()
            .with_sink(Arc::new(sink.clone()));

    let result = orchestrator.run_cycle_at(now()).await;

    assert!(matches!(result, Err(CycleError::Ledger(_))));
    assert!(sink.is_empty().await);
    assert!(!orchestrator.is_running_cycle());
}

#[tokio::test]
async fn test_oversell_degrades_symbol() {
    let ledger = InMemoryLedger::from_trades([
        buy("LINKUSD", dec!(1), dec!(10), 0),
        sell("LINKUSD", dec!(2), dec!(12), 1),
        buy("BTCUSD", dec!(0.1), dec!(58000), 0),
    ])
    .unwrap();
    let market = basket_market().await;
    let orchestrator =
        CycleOrchestrator::new(&config(), Arc::new(ledger), market.clone(), market).unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    let link = summary.decision("LINKUSD").unwrap();
    assert!(link.is_degraded());
    assert!(link.explanation.notes[0].contains("Insufficient position"));
    assert!(!summary.decision("BTCUSD").unwrap().is_degraded());
}

#[tokio::test]
async fn test_oversold_symbol_keeps_report_partial() {
    let ledger = InMemoryLedger::from_trades([
        buy("LINKUSD", dec!(500), dec!(10), 0),
        sell("LINKUSD", dec!(600), dec!(12), 1),
        buy("LINKUSD", dec!(500), dec!(11), 2),
        buy("BTCUSD", dec!(0.1), dec!(58000), 0),
    ])
    .unwrap();
    let market = basket_market().await;
    let orchestrator =
        CycleOrchestrator::new(&config(), Arc::new(ledger), market.clone(), market).unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    assert!(summary.report.partial);
    assert_eq!(summary.report.degraded_symbols, vec!["LINKUSD".to_string()]);
    assert!(matches!(
        summary.report.get("LINKUSD").unwrap().status,
        SymbolStatus::Unresolved { .. }
    ));
    assert!(summary.decision("LINKUSD").unwrap().is_degraded());

    // LINKUSD exposure is unknown, so no other symbol may add to it
    let btc = summary.decision("BTCUSD").unwrap();
    assert_eq!(btc.action, Action::Hold);
    assert_eq!(
        btc.outcome,
        ValidatorOutcome::Rejected {
            reasons: vec![RejectReason::UnknownExposure {
                symbols: vec!["LINKUSD".to_string()]
            }]
        }
    );
}

#[tokio::test]
async fn test_overflowing_trade_degrades_symbol() {
    let huge = Decimal::from(1_000_000_000_000_000u64);
    let ledger = InMemoryLedger::from_trades([
        buy("BTCUSD", huge, huge, 0),
        buy("ETHUSD", dec!(3), dec!(2450), 1),
    ])
    .unwrap();
    let market = basket_market().await;
    let orchestrator = Arc::new(
        CycleOrchestrator::new(&config(), Arc::new(ledger), market.clone(), market).unwrap(),
    );

    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_cycle_at(now()).await })
    };
    let summary = handle.await.unwrap().unwrap();

    let btc = summary.decision("BTCUSD").unwrap();
    assert!(btc.is_degraded());
    assert!(btc.explanation.notes[0].contains("overflow"));
    assert!(!summary.decision("ETHUSD").unwrap().is_degraded());
    assert_eq!(summary.report.total_investment, dec!(7350));
}

#[tokio::test]
async fn test_overflowing_mark_degrades_symbol() {
    let huge = Decimal::from(1_000_000_000_000_000u64);
    let ledger = InMemoryLedger::from_trades([
        buy("LINKUSD", huge, dec!(1), 0),
        buy("ETHUSD", dec!(3), dec!(2450), 1),
    ])
    .unwrap();
    let market = market(vec![
        bullish_snapshot("BTCUSD", dec!(60000)),
        snapshot("ETHUSD", dec!(2500)),
        bullish_snapshot("LINKUSD", huge),
    ])
    .await;
    let orchestrator =
        CycleOrchestrator::new(&config(), Arc::new(ledger), market.clone(), market).unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    assert!(summary.decision("LINKUSD").unwrap().is_degraded());
    assert_eq!(summary.report.degraded_symbols, vec!["LINKUSD".to_string()]);
    assert!(!summary.decision("ETHUSD").unwrap().is_degraded());
    assert_eq!(summary.report.total_current_value, dec!(7500));
}

#[tokio::test]
async fn test_old_snapshot_timestamp_is_stale() {
    let market = basket_market().await;
    market
        .set_snapshot(
            MarketSnapshot::new("LINKUSD", dec!(100), now() - Duration::days(30))
                .with_indicators(bullish())
                .with_sentiment(Sentiment::new(dec!(1))),
        )
        .await;
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    let link = summary.decision("LINKUSD").unwrap();
    assert_eq!(link.action, Action::Hold);
    assert_eq!(
        link.outcome,
        ValidatorOutcome::Rejected {
            reasons: vec![RejectReason::StaleSnapshot {
                age_secs: 30 * 24 * 3600,
                max_age_secs: 600
            }]
        }
    );
}

#[tokio::test]
async fn test_static_snapshot_ages_between_cycles() {
    let market = basket_market().await;
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap();

    let fresh = orchestrator.run_cycle_at(now()).await.unwrap();
    assert_eq!(fresh.decision("LINKUSD").unwrap().action, Action::Buy);

    let later = orchestrator
        .run_cycle_at(now() + Duration::minutes(11))
        .await
        .unwrap();
    let link = later.decision("LINKUSD").unwrap();
    assert_eq!(link.action, Action::Hold);
    assert!(matches!(
        link.outcome,
        ValidatorOutcome::Rejected { ref reasons }
            if matches!(reasons[0], RejectReason::StaleSnapshot { age_secs: 660, .. })
    ));
}

#[tokio::test]
async fn test_cycle_reads_ledger_once_for_the_universe() {
    let ledger = UniverseReadLedger(basket_ledger());
    let market = basket_market().await;
    let orchestrator =
        CycleOrchestrator::new(&config(), Arc::new(ledger), market.clone(), market).unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    assert_eq!(summary.degraded_count(), 0);
    assert_eq!(summary.report.get("BTCUSD").unwrap().quantity, dec!(0.2));
    assert_eq!(summary.report.get("ETHUSD").unwrap().quantity, dec!(3));
}

#[tokio::test]
async fn test_overlapping_cycle_refused() {
    let inner = basket_market().await;
    let gated = Arc::new(GatedMarket::closed(inner.clone()));
    let gate = gated.gate.clone();
    let orchestrator = Arc::new(
        CycleOrchestrator::new(&config(), Arc::new(basket_ledger()), gated, inner).unwrap(),
    );

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run_cycle_at(now()).await })
    };

    while !orchestrator.is_running_cycle() {
        tokio::task::yield_now().await;
    }

    let second = orchestrator.run_cycle_at(now()).await;
    assert!(matches!(second, Err(CycleError::AlreadyRunning)));

    gate.add_permits(16);
    let summary = first.await.unwrap().unwrap();
    assert_eq!(summary.degraded_count(), 0);
    assert!(!orchestrator.is_running_cycle());

    // The guard is released, so the next cycle runs
    assert!(orchestrator.run_cycle_at(now()).await.is_ok());
}

#[tokio::test]
async fn test_snapshot_timeout_degrades() {
    let inner = basket_market().await;
    let gated = Arc::new(GatedMarket::closed(inner.clone()));
    let mut config = config();
    config.orchestrator.snapshot_timeout_ms = 50;
    let orchestrator =
        CycleOrchestrator::new(&config, Arc::new(basket_ledger()), gated, inner).unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();

    assert_eq!(summary.degraded_count(), 3);
    for decision in &summary.decisions {
        assert_eq!(decision.action, Action::Hold);
        assert!(decision.explanation.notes[0].contains("timed out after 50ms"));
    }
    assert!(summary.report.partial);
}

#[tokio::test]
async fn test_trades_after_cycle_start_ignored() {
    let ledger = Arc::new(basket_ledger());
    ledger
        .append_trade(buy("LINKUSD", dec!(5), dec!(90), 45))
        .await
        .unwrap();
    let market = basket_market().await;
    let orchestrator =
        CycleOrchestrator::new(&config(), ledger.clone(), market.clone(), market).unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();
    assert!(summary.report.get("LINKUSD").map_or(true, |e| e.quantity == dec!(0)));

    let later = orchestrator
        .run_cycle_at(now() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(later.report.get("LINKUSD").unwrap().quantity, dec!(5));
}

#[tokio::test]
async fn test_missing_benchmark_is_not_fatal() {
    let market = basket_market().await;
    market.set_benchmark_return(None).await;
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();
    assert_eq!(summary.report.benchmark_return_pct, None);
    assert_eq!(summary.report.excess_return_pct, None);
    assert_eq!(summary.degraded_count(), 0);
}

#[tokio::test]
async fn test_stopped_orchestrator_refuses_cycles() {
    let market = basket_market().await;
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap();

    orchestrator.stop();
    assert!(matches!(
        orchestrator.run_cycle().await,
        Err(CycleError::Stopped)
    ));
}

#[tokio::test]
async fn test_run_loop_honours_cycle_limit_and_shutdown() {
    let market = basket_market().await;
    let sink = MemoryDecisionSink::new();
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market.clone(),
    )
    .unwrap()
    .with_sink(Arc::new(sink.clone()));

    let outcome = orchestrator.run_for(CancellationToken::new(), Some(1)).await;
    assert_eq!(outcome.cycles_completed, 1);
    assert_eq!(sink.len().await, 3);
    assert!(outcome.last_summary.is_some());
    assert!(orchestrator.is_stopped());

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let fresh = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap();
    let outcome = fresh.run(cancelled).await;
    assert_eq!(outcome.cycles_completed, 0);
    assert!(outcome.last_summary.is_none());
}

#[tokio::test]
async fn test_jsonl_sink_receives_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decisions.jsonl");
    let market = basket_market().await;
    let orchestrator = CycleOrchestrator::new(
        &config(),
        Arc::new(basket_ledger()),
        market.clone(),
        market,
    )
    .unwrap()
    .with_sink(Arc::new(JsonlDecisionSink::open(&path).await.unwrap()));

    orchestrator.run_cycle_at(now()).await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.lines().next().unwrap().contains("\"symbol\":\"BTCUSD\""));
}

#[tokio::test]
async fn test_invalid_config_rejected_at_construction() {
    let market = basket_market().await;
    let mut config = config();
    config.fusion.risk_weight = dec!(0.5);
    let result = CycleOrchestrator::new(&config, Arc::new(basket_ledger()), market.clone(), market);
    assert!(result.is_err());
}
