//! Portfolio-risk scoring

use super::{checked_ratio, clamp_unit, saturating_mul, saturating_sub, RiskAssessment, RiskTrigger};
use crate::config::RiskConfig;
use crate::profitability::{ProfitabilityReport, SymbolProfitability, SymbolStatus};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Scores how much room a symbol has for more exposure
///
/// Stop-loss and take-profit breaches force the score to -1. Otherwise the
/// score falls linearly with the position's share of equity: +1 when flat,
/// 0 at half the single-position cap, -1 at the cap.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    max_position_pct: Decimal,
    stop_loss_pct: Decimal,
    take_profit_pct: Decimal,
    portfolio_stop_loss_pct: Decimal,
}

impl RiskScorer {
    /// Create a risk scorer
    pub fn new(max_position_pct: Decimal, stop_loss_pct: Decimal, take_profit_pct: Decimal) -> Self {
        Self {
            max_position_pct,
            stop_loss_pct,
            take_profit_pct,
            portfolio_stop_loss_pct: dec!(-10),
        }
    }

    /// Set the portfolio-wide emergency stop
    pub fn with_portfolio_stop_loss(mut self, pct: Decimal) -> Self {
        self.portfolio_stop_loss_pct = pct;
        self
    }

    /// Create from the `[risk]` section
    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(
            config.max_position_pct,
            config.stop_loss_pct,
            config.take_profit_pct,
        )
        .with_portfolio_stop_loss(config.portfolio_stop_loss_pct)
    }

    /// Portfolio unrealized loss percentage, when it breaches the emergency stop
    pub fn portfolio_stop(&self, report: &ProfitabilityReport) -> Option<Decimal> {
        report
            .unrealized_pnl_pct()
            .filter(|pct| *pct <= self.portfolio_stop_loss_pct)
    }

    /// Score one symbol against current equity
    pub fn score(&self, entry: Option<&SymbolProfitability>, equity: Decimal) -> RiskAssessment {
        if equity <= Decimal::ZERO {
            return RiskAssessment {
                score: -Decimal::ONE,
                trigger: RiskTrigger::NoEquity,
            };
        }

        let held = entry.filter(|e| e.quantity > Decimal::ZERO);

        if let Some(e) = held.filter(|e| e.status == SymbolStatus::Marked) {
            if e.unrealized_pnl_pct <= self.stop_loss_pct {
                return RiskAssessment {
                    score: -Decimal::ONE,
                    trigger: RiskTrigger::StopLoss {
                        unrealized_pct: e.unrealized_pnl_pct,
                    },
                };
            }
            if e.unrealized_pnl_pct >= self.take_profit_pct {
                return RiskAssessment {
                    score: -Decimal::ONE,
                    trigger: RiskTrigger::TakeProfit {
                        unrealized_pct: e.unrealized_pnl_pct,
                    },
                };
            }
        }

        // Unpriced positions fall back to cost basis
        let value = held
            .map(|e| e.market_value.unwrap_or(e.cost_basis))
            .unwrap_or(Decimal::ZERO);
        let weight_pct = checked_ratio(saturating_mul(value, dec!(100)), equity).unwrap_or(Decimal::ZERO);
        let usage = checked_ratio(saturating_mul(weight_pct, dec!(2)), self.max_position_pct)
            .unwrap_or(Decimal::MAX);

        RiskAssessment {
            score: clamp_unit(saturating_sub(Decimal::ONE, usage)),
            trigger: RiskTrigger::Concentration { weight_pct },
        }
    }
}
