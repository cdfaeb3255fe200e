//! Reference portfolio and fusion scenarios

use crate::common::*;
use basket_trader::decision::{Action, DecisionFusion, FusionWeights};
use basket_trader::ledger::InMemoryLedger;
use basket_trader::market::MarketSnapshot;
use basket_trader::position::{Position, PositionCalculator, PositionState};
use basket_trader::profitability::{compute_portfolio_report, SymbolStatus};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

async fn position(ledger: &InMemoryLedger, symbol: &str) -> PositionState {
    PositionCalculator::new()
        .position_as_of(ledger, symbol, now())
        .await
        .unwrap()
}

fn marks(snapshots: Vec<MarketSnapshot>) -> BTreeMap<String, MarketSnapshot> {
    snapshots
        .into_iter()
        .map(|s| (s.symbol.clone(), s))
        .collect()
}

#[tokio::test]
async fn scenario_a_unrealized_gain() {
    let ledger = InMemoryLedger::from_trades([buy("AAPL", dec!(100), dec!(50), 0)]).unwrap();
    let state = position(&ledger, "AAPL").await;

    let report = compute_portfolio_report(
        now(),
        &[state],
        &marks(vec![snapshot("AAPL", dec!(60))]),
        None,
    );

    let aapl = report.get("AAPL").unwrap();
    assert_eq!(aapl.avg_cost, dec!(50));
    assert_eq!(aapl.unrealized_pnl, dec!(1000));
    assert_eq!(report.total_investment, dec!(5000));
    assert_eq!(report.total_return_pct, dec!(20));
}

#[tokio::test]
async fn scenario_b_partial_sell_realizes_against_avg_cost() {
    let ledger = InMemoryLedger::from_trades([
        buy("AAPL", dec!(100), dec!(50), 0),
        sell("AAPL", dec!(40), dec!(70), 1),
    ])
    .unwrap();
    let state = position(&ledger, "AAPL").await;

    assert_eq!(state.realized_pnl, dec!(800));
    assert_eq!(
        state.position,
        Position {
            symbol: "AAPL".to_string(),
            quantity: dec!(60),
            avg_cost: dec!(50),
        }
    );
}

#[tokio::test]
async fn scenario_c_missing_snapshot_marks_report_partial() {
    let ledger = InMemoryLedger::from_trades([
        buy("AAPL", dec!(100), dec!(50), 0),
        buy("MSFT", dec!(10), dec!(300), 0),
    ])
    .unwrap();
    let positions = vec![
        position(&ledger, "AAPL").await,
        position(&ledger, "MSFT").await,
    ];

    let report = compute_portfolio_report(
        now(),
        &positions,
        &marks(vec![snapshot("AAPL", dec!(60))]),
        Some(dec!(5)),
    );

    assert!(report.partial);
    assert_eq!(report.degraded_symbols, vec!["MSFT".to_string()]);
    assert!(matches!(
        report.get("MSFT").unwrap().status,
        SymbolStatus::Degraded { .. }
    ));
    assert_eq!(report.total_investment, dec!(5000));
    assert_eq!(report.total_current_value, dec!(6000));
    assert_eq!(report.excess_return_pct, Some(dec!(15)));
}

#[test]
fn scenario_d_opposed_signals_hold() {
    let fusion = DecisionFusion::new(
        FusionWeights::new(dec!(0.5), dec!(0.5), dec!(0)).unwrap(),
        dec!(0.3),
        dec!(0.3),
        dec!(0.25),
        dec!(10),
    );

    let result = fusion.fuse(dec!(0.9), dec!(-0.9), dec!(0), &Position::flat("AAPL"));

    assert_eq!(result.combined_score, dec!(0));
    assert_eq!(result.action, Action::Hold);
    assert!(result.confidence <= dec!(0.5));
}
