//! Decision validator
//!
//! The single place hard risk limits are enforced. A fusion result is
//! either VALID or REJECTED; a rejection forces HOLD and appends every
//! triggered rule to the explanation.

use super::{Action, FusionResult, RejectReason, ValidatorOutcome};
use crate::config::RiskConfig;
use crate::signal::{checked_ratio, saturating_add, saturating_mul, saturating_sub};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Portfolio state a decision is checked against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    /// Current market value of the symbol's position
    pub symbol_value: Decimal,
    /// Price a proposed trade would execute at
    pub price: Decimal,
    /// Age of the snapshot that fed the decision
    pub snapshot_age_secs: u64,
    /// Capital plus total P&L
    pub equity: Decimal,
    /// Marked positions at market value plus unpriced ones at cost
    pub total_exposure_value: Decimal,
    /// Quantity of this symbol held
    pub held_quantity: Decimal,
    /// Average cost of the held quantity
    pub avg_cost: Decimal,
    /// Quantity held across the universe
    pub total_quantity: Decimal,
    /// Symbols whose position could not be derived this cycle
    pub unresolved_symbols: Vec<String>,
    /// A stop-loss is forcing the exit, so fees do not hold it back
    pub protective_exit: bool,
}

#[derive(Debug, Clone)]
pub struct DecisionValidator {
    max_position_pct: Decimal,
    max_exposure_pct: Decimal,
    max_snapshot_age_secs: u64,
    trade_quantity: Decimal,
    max_total_quantity: Option<Decimal>,
    fee_rate: Option<Decimal>,
}

impl DecisionValidator {
    pub fn new(
        max_position_pct: Decimal,
        max_exposure_pct: Decimal,
        max_snapshot_age_secs: u64,
        trade_quantity: Decimal,
    ) -> Self {
        Self {
            max_position_pct,
            max_exposure_pct,
            max_snapshot_age_secs,
            trade_quantity,
            max_total_quantity: None,
            fee_rate: None,
        }
    }

    /// Cap the quantity held across the whole universe
    pub fn with_max_total_quantity(mut self, max: Option<Decimal>) -> Self {
        self.max_total_quantity = max;
        self
    }

    /// Reject sells that do not clear round-trip fees at `rate` of notional
    pub fn with_fee_rate(mut self, rate: Option<Decimal>) -> Self {
        self.fee_rate = rate;
        self
    }

    pub fn from_config(config: &RiskConfig) -> Self {
        Self::new(
            config.max_position_pct,
            config.max_exposure_pct,
            config.max_snapshot_age_seconds,
            config.trade_quantity,
        )
        .with_max_total_quantity(config.max_total_quantity)
        .with_fee_rate(config.fee_rate)
    }

    /// Check a fusion result, returning the possibly downgraded result and its outcome
    pub fn validate(
        &self,
        mut result: FusionResult,
        ctx: &ValidationContext,
    ) -> (FusionResult, ValidatorOutcome) {
        let reasons = self.violations(result.action, ctx);
        if reasons.is_empty() {
            return (result, ValidatorOutcome::Valid);
        }

        for reason in &reasons {
            result
                .explanation
                .push_note(format!("REJECTED {}: {}", result.action, reason));
        }
        result.action = Action::Hold;
        (result, ValidatorOutcome::Rejected { reasons })
    }

    /// Every rule the proposed action would break
    pub fn violations(&self, action: Action, ctx: &ValidationContext) -> Vec<RejectReason> {
        let mut reasons = Vec::new();

        if ctx.snapshot_age_secs > self.max_snapshot_age_secs {
            reasons.push(RejectReason::StaleSnapshot {
                age_secs: ctx.snapshot_age_secs,
                max_age_secs: self.max_snapshot_age_secs,
            });
        }

        // Selling only reduces exposure
        if action == Action::Sell {
            if let Some(net_pnl) = self.unprofitable_sell(ctx) {
                reasons.push(RejectReason::UnprofitableSell { net_pnl });
            }
            return reasons;
        }

        if action == Action::Buy && !ctx.unresolved_symbols.is_empty() {
            reasons.push(RejectReason::UnknownExposure {
                symbols: ctx.unresolved_symbols.clone(),
            });
        }

        let added = if action == Action::Buy {
            saturating_mul(self.trade_quantity, ctx.price)
        } else {
            Decimal::ZERO
        };

        if ctx.equity <= Decimal::ZERO {
            reasons.push(RejectReason::ExposureLimit {
                proposed_pct: None,
                max_pct: self.max_exposure_pct,
            });
            return reasons;
        }

        let position_pct = pct_of(saturating_add(ctx.symbol_value, added), ctx.equity);
        if position_pct > self.max_position_pct {
            reasons.push(RejectReason::PositionLimit {
                proposed_pct: position_pct,
                max_pct: self.max_position_pct,
            });
        }

        let exposure_pct = pct_of(saturating_add(ctx.total_exposure_value, added), ctx.equity);
        if exposure_pct > self.max_exposure_pct {
            reasons.push(RejectReason::ExposureLimit {
                proposed_pct: Some(exposure_pct),
                max_pct: self.max_exposure_pct,
            });
        }

        if let (Action::Buy, Some(max)) = (action, self.max_total_quantity) {
            let proposed = saturating_add(ctx.total_quantity, self.trade_quantity);
            if proposed > max {
                reasons.push(RejectReason::TotalQuantityLimit { proposed, max });
            }
        }

        reasons
    }

    /// Net P&L of the proposed sell after buy and sell fees, when not positive
    fn unprofitable_sell(&self, ctx: &ValidationContext) -> Option<Decimal> {
        let rate = self.fee_rate?;
        if ctx.protective_exit || ctx.held_quantity <= Decimal::ZERO {
            return None;
        }
        let quantity = self.trade_quantity.min(ctx.held_quantity);
        let gross = saturating_mul(saturating_sub(ctx.price, ctx.avg_cost), quantity);
        let notional = saturating_mul(saturating_add(ctx.avg_cost, ctx.price), quantity);
        let net_pnl = saturating_sub(gross, saturating_mul(notional, rate));
        (net_pnl <= Decimal::ZERO).then_some(net_pnl)
    }
}

/// `value` as a percentage of positive `equity`
fn pct_of(value: Decimal, equity: Decimal) -> Decimal {
    checked_ratio(value, equity)
        .map(|ratio| saturating_mul(ratio, dec!(100)))
        .unwrap_or(Decimal::MAX)
}
