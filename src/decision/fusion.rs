//! Decision fusion
//!
//! Purely signal-driven: hard risk limits live in the validator. The one
//! exception is a BUY on a position already at the configured maximum
//! quantity, which is downgraded here before validation.

use super::{Action, Explanation, FactorContribution, FusionResult};
use crate::config::{check_weights, ConfigError, FusionConfig};
use crate::position::Position;
use crate::signal::clamp_unit;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Confidence ceiling when technical and sentiment point in opposite directions
const DISAGREEMENT_CAP: Decimal = dec!(0.5);

/// Technical/sentiment/risk weights, validated to sum to one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusionWeights {
    pub technical: Decimal,
    pub sentiment: Decimal,
    pub risk: Decimal,
}

impl FusionWeights {
    /// Validate and build a weight set
    pub fn new(technical: Decimal, sentiment: Decimal, risk: Decimal) -> Result<Self, ConfigError> {
        check_weights("fusion", &[technical, sentiment, risk])?;
        Ok(Self {
            technical,
            sentiment,
            risk,
        })
    }
}

/// Combines sub-scores into an action, confidence and explanation
#[derive(Debug, Clone)]
pub struct DecisionFusion {
    weights: FusionWeights,
    theta_buy: Decimal,
    theta_sell: Decimal,
    agreement_boost: Decimal,
    max_position_quantity: Decimal,
}

impl DecisionFusion {
    /// Create a fusion stage
    pub fn new(
        weights: FusionWeights,
        theta_buy: Decimal,
        theta_sell: Decimal,
        agreement_boost: Decimal,
        max_position_quantity: Decimal,
    ) -> Self {
        Self {
            weights,
            theta_buy,
            theta_sell,
            agreement_boost,
            max_position_quantity,
        }
    }

    /// Create from the `[fusion]` section
    pub fn from_config(config: &FusionConfig) -> Result<Self, ConfigError> {
        let weights = FusionWeights::new(
            config.technical_weight,
            config.sentiment_weight,
            config.risk_weight,
        )?;
        Ok(Self::new(
            weights,
            config.theta_buy,
            config.theta_sell,
            config.agreement_boost,
            config.max_position_quantity,
        ))
    }

    /// Fuse sub-scores for one symbol
    pub fn fuse(
        &self,
        technical: Decimal,
        sentiment: Decimal,
        risk: Decimal,
        position: &Position,
    ) -> FusionResult {
        let mut factors = vec![
            factor("technical", technical, self.weights.technical),
            factor("sentiment", sentiment, self.weights.sentiment),
            factor("risk", risk, self.weights.risk),
        ];

        let combined_score = clamp_unit(factors.iter().map(|f| f.contribution).sum());

        // Stable sort keeps technical > sentiment > risk on ties
        factors.sort_by(|a, b| b.contribution.abs().cmp(&a.contribution.abs()));

        let mut action = if combined_score >= self.theta_buy {
            Action::Buy
        } else if combined_score <= -self.theta_sell {
            Action::Sell
        } else {
            Action::Hold
        };

        let confidence = self.confidence(combined_score, technical, sentiment);
        let mut explanation = Explanation {
            factors,
            notes: vec![],
        };

        if action == Action::Buy && position.quantity >= self.max_position_quantity {
            action = Action::Hold;
            explanation.push_note(format!(
                "BUY downgraded to HOLD: holding {} of max {}",
                position.quantity.normalize(),
                self.max_position_quantity.normalize()
            ));
        }

        FusionResult {
            action,
            combined_score,
            confidence,
            explanation,
        }
    }

    /// Override the fused action with an exit: SELL when holding, HOLD otherwise
    pub fn force_exit(
        &self,
        mut result: FusionResult,
        position: &Position,
        reason: &str,
    ) -> FusionResult {
        let action = if position.is_open() {
            Action::Sell
        } else {
            Action::Hold
        };
        if result.action != action {
            result
                .explanation
                .push_note(format!("{} overridden to {}: {}", result.action, action, reason));
        }
        result.action = action;
        result
    }

    /// Confidence grows with |combined| and with technical/sentiment agreement
    pub fn confidence(&self, combined: Decimal, technical: Decimal, sentiment: Decimal) -> Decimal {
        let magnitude = combined.abs().min(Decimal::ONE);
        let both_nonzero = !technical.is_zero() && !sentiment.is_zero();
        let same_sign = technical.is_sign_negative() == sentiment.is_sign_negative();

        let confidence = match (both_nonzero, same_sign) {
            (true, true) => magnitude * (Decimal::ONE + self.agreement_boost),
            (true, false) => magnitude.min(DISAGREEMENT_CAP),
            (false, _) => magnitude,
        };
        confidence.clamp(Decimal::ZERO, Decimal::ONE)
    }
}

fn factor(name: &str, raw_value: Decimal, weight: Decimal) -> FactorContribution {
    FactorContribution {
        factor: name.to_string(),
        raw_value,
        weight,
        contribution: raw_value * weight,
    }
}
