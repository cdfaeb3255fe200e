//! Exposure limits enforced through a full cycle

use crate::common::*;
use basket_trader::config::Config;
use basket_trader::decision::{Action, RejectReason, ValidatorOutcome};
use basket_trader::ledger::InMemoryLedger;
use basket_trader::orchestrator::CycleOrchestrator;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn single_symbol(capital: Decimal) -> Config {
    let mut config = config();
    config.universe.symbols = vec!["BTCUSD".to_string()];
    config.universe.capital = capital;
    config.risk.max_position_pct = dec!(100);
    config
}

/// 0.9 BTC held at 8000; a BUY of 0.1 brings the position to 8000
async fn run(capital: Decimal) -> basket_trader::decision::Decision {
    let ledger = InMemoryLedger::from_trades([buy("BTCUSD", dec!(0.9), dec!(8000), 0)]).unwrap();
    let market = market(vec![bullish_snapshot("BTCUSD", dec!(8000))]).await;
    let orchestrator = CycleOrchestrator::new(
        &single_symbol(capital),
        Arc::new(ledger),
        market.clone(),
        market,
    )
    .unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();
    summary.decisions.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_buy_exactly_at_exposure_limit_is_valid() {
    // (7200 + 800) / 10000 = 80%
    let decision = run(dec!(10000)).await;
    assert_eq!(decision.action, Action::Buy);
    assert_eq!(decision.outcome, ValidatorOutcome::Valid);
    assert!(decision.is_actionable());
}

#[tokio::test]
async fn test_buy_one_unit_over_exposure_limit_is_held() {
    let decision = run(dec!(9999)).await;
    assert_eq!(decision.action, Action::Hold);
    assert!(!decision.is_actionable());
    assert!(decision.confidence > dec!(0));

    match decision.outcome {
        ValidatorOutcome::Rejected { ref reasons } => {
            assert_eq!(reasons.len(), 1);
            assert!(matches!(reasons[0], RejectReason::ExposureLimit { .. }));
        }
        ref other => panic!("expected rejection, got {:?}", other),
    }
    assert!(decision
        .explanation
        .notes
        .iter()
        .any(|n| n.starts_with("REJECTED BUY")));
}

#[tokio::test]
async fn test_stale_snapshot_rejected() {
    let ledger = InMemoryLedger::new();
    let market = market(vec![
        bullish_snapshot("BTCUSD", dec!(8000)).with_age_secs(601)
    ])
    .await;
    let orchestrator = CycleOrchestrator::new(
        &single_symbol(dec!(100000)),
        Arc::new(ledger),
        market.clone(),
        market,
    )
    .unwrap();

    let summary = orchestrator.run_cycle_at(now()).await.unwrap();
    let decision = &summary.decisions[0];

    assert_eq!(decision.action, Action::Hold);
    assert!(!decision.is_degraded());
    assert_eq!(
        decision.outcome,
        ValidatorOutcome::Rejected {
            reasons: vec![RejectReason::StaleSnapshot {
                age_secs: 601,
                max_age_secs: 600
            }]
        }
    );
}
