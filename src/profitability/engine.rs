//! Portfolio report computation

use super::{ProfitabilityError, ProfitabilityReport, SymbolProfitability, SymbolStatus};
use crate::market::MarketSnapshot;
use crate::position::{Position, PositionState};
use crate::signal::{checked_ratio, saturating_add, saturating_mul, saturating_sub};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Mark-to-market figures of one open position
struct Mark {
    cost_basis: Decimal,
    market_value: Decimal,
    unrealized_pnl: Decimal,
    unrealized_pnl_pct: Decimal,
}

/// `None` when any figure leaves the decimal range
fn mark(position: &Position, price: Decimal) -> Option<Mark> {
    let cost_basis = position.quantity.checked_mul(position.avg_cost)?;
    let market_value = position.quantity.checked_mul(price)?;
    let unrealized_pnl = position
        .quantity
        .checked_mul(price.checked_sub(position.avg_cost)?)?;
    let unrealized_pnl_pct = if cost_basis > Decimal::ZERO {
        unrealized_pnl.checked_div(cost_basis)?.checked_mul(dec!(100))?
    } else {
        Decimal::ZERO
    };
    Some(Mark {
        cost_basis,
        market_value,
        unrealized_pnl,
        unrealized_pnl_pct,
    })
}

#[derive(Default)]
struct Totals {
    investment: Decimal,
    current_value: Decimal,
    unrealized_pnl: Decimal,
    realized_pnl: Decimal,
    fees: Decimal,
}

impl Totals {
    /// Totals with one more symbol folded in, `None` on overflow
    fn add(&self, state: &PositionState, mark: Option<&Mark>) -> Option<Self> {
        let (investment, current_value, unrealized_pnl) = match mark {
            Some(m) => (m.cost_basis, m.market_value, m.unrealized_pnl),
            None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        };
        Some(Self {
            investment: self.investment.checked_add(investment)?,
            current_value: self.current_value.checked_add(current_value)?,
            unrealized_pnl: self.unrealized_pnl.checked_add(unrealized_pnl)?,
            realized_pnl: self.realized_pnl.checked_add(state.realized_pnl)?,
            fees: self.fees.checked_add(state.fees_paid)?,
        })
    }
}

/// Build the portfolio report from positions and this cycle's snapshots
///
/// Pure function of its inputs: identical arguments yield identical reports.
/// A held symbol without a snapshot is marked degraded and left out of the
/// investment and current-value totals; its realized P&L still counts. A
/// symbol whose figures overflow is degraded and left out of every total.
pub fn compute_portfolio_report(
    as_of: DateTime<Utc>,
    positions: &[PositionState],
    snapshots: &BTreeMap<String, MarketSnapshot>,
    benchmark_return_pct: Option<Decimal>,
) -> ProfitabilityReport {
    let mut symbols = BTreeMap::new();
    let mut degraded_symbols = Vec::new();
    let mut totals = Totals::default();

    for state in positions {
        let position = &state.position;
        let current_price = snapshots.get(position.symbol.as_str()).map(|s| s.close);
        let cost_basis = position
            .quantity
            .checked_mul(position.avg_cost)
            .unwrap_or(Decimal::MAX);

        let base = |status: SymbolStatus| SymbolProfitability {
            symbol: position.symbol.clone(),
            quantity: position.quantity,
            avg_cost: position.avg_cost,
            current_price,
            cost_basis: Decimal::ZERO,
            market_value: None,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            realized_pnl: state.realized_pnl,
            fees_paid: state.fees_paid,
            status,
        };

        let (marked, figures) = if !position.is_open() {
            let closed = SymbolProfitability {
                market_value: Some(Decimal::ZERO),
                ..base(SymbolStatus::Closed)
            };
            (Some(closed), None)
        } else {
            match current_price.map(|price| mark(position, price)) {
                Some(Some(m)) => {
                    let marked = SymbolProfitability {
                        cost_basis: m.cost_basis,
                        market_value: Some(m.market_value),
                        unrealized_pnl: m.unrealized_pnl,
                        unrealized_pnl_pct: m.unrealized_pnl_pct,
                        ..base(SymbolStatus::Marked)
                    };
                    (Some(marked), Some(m))
                }
                Some(None) => (None, None),
                None => {
                    let err = ProfitabilityError::StaleSnapshot {
                        symbol: position.symbol.clone(),
                    };
                    tracing::warn!(symbol = %position.symbol, error = %err, "Excluding held symbol from mark-to-market");
                    let degraded = SymbolProfitability {
                        current_price: None,
                        cost_basis,
                        ..base(SymbolStatus::Degraded {
                            reason: err.to_string(),
                        })
                    };
                    (Some(degraded), None)
                }
            }
        };

        let folded = marked.and_then(|e| totals.add(state, figures.as_ref()).map(|t| (e, t)));
        let entry = match folded {
            Some((entry, next)) => {
                totals = next;
                entry
            }
            None => {
                let err = ProfitabilityError::Overflow {
                    symbol: position.symbol.clone(),
                };
                tracing::warn!(symbol = %position.symbol, error = %err, "Excluding symbol from every total");
                SymbolProfitability {
                    cost_basis,
                    market_value: None,
                    realized_pnl: Decimal::ZERO,
                    fees_paid: Decimal::ZERO,
                    ..base(SymbolStatus::Degraded {
                        reason: err.to_string(),
                    })
                }
            }
        };

        if entry.is_degraded() {
            degraded_symbols.push(position.symbol.clone());
        }
        symbols.insert(position.symbol.clone(), entry);
    }

    degraded_symbols.sort();
    let total_pnl = saturating_add(totals.realized_pnl, totals.unrealized_pnl);
    let return_undefined = totals.investment == Decimal::ZERO;
    let total_return_pct = if return_undefined {
        Decimal::ZERO
    } else {
        checked_ratio(total_pnl, totals.investment)
            .map(|ratio| saturating_mul(ratio, dec!(100)))
            .unwrap_or(Decimal::ZERO)
    };
    let excess_return_pct = benchmark_return_pct.map(|b| saturating_sub(total_return_pct, b));

    ProfitabilityReport {
        as_of,
        symbols,
        total_investment: totals.investment,
        total_current_value: totals.current_value,
        total_unrealized_pnl: totals.unrealized_pnl,
        total_realized_pnl: totals.realized_pnl,
        total_pnl,
        total_fees: totals.fees,
        net_pnl: saturating_sub(total_pnl, totals.fees),
        total_return_pct,
        return_undefined,
        benchmark_return_pct,
        excess_return_pct,
        partial: !degraded_symbols.is_empty(),
        degraded_symbols,
    }
}
