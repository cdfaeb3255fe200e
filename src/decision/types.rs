//! Decision types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Trading action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        };
        f.write_str(name)
    }
}

/// One factor's share of the combined score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: String,
    pub raw_value: Decimal,
    pub weight: Decimal,
    /// raw_value * weight
    pub contribution: Decimal,
}

/// Audit trail of a decision
///
/// `factors` is sorted by absolute contribution, largest first. `notes`
/// records downgrades, rejections and faults in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub factors: Vec<FactorContribution>,
    pub notes: Vec<String>,
}

impl Explanation {
    /// Explanation consisting of a single note
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            factors: vec![],
            notes: vec![note.into()],
        }
    }

    /// Append a note
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// Output of decision fusion, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionResult {
    pub action: Action,
    /// Weighted sum of technical, sentiment and risk scores
    pub combined_score: Decimal,
    /// Confidence in [0, 1]
    pub confidence: Decimal,
    pub explanation: Explanation,
}

/// Hard-limit rule that rejected a decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RejectReason {
    /// Post-trade position above the single-position cap
    PositionLimit {
        proposed_pct: Decimal,
        max_pct: Decimal,
    },
    /// Post-trade exposure above the portfolio cap; `None` when equity is not positive
    ExposureLimit {
        proposed_pct: Option<Decimal>,
        max_pct: Decimal,
    },
    /// Snapshot older than allowed
    StaleSnapshot { age_secs: u64, max_age_secs: u64 },
    /// Some held quantity could not be derived, so exposure is unknown
    UnknownExposure { symbols: Vec<String> },
    /// Post-trade quantity across the universe above the portfolio cap
    TotalQuantityLimit { proposed: Decimal, max: Decimal },
    /// Selling would not cover the round-trip fees
    UnprofitableSell { net_pnl: Decimal },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::PositionLimit {
                proposed_pct,
                max_pct,
            } => write!(
                f,
                "position would be {:.2}% of equity, limit {}%",
                proposed_pct, max_pct
            ),
            RejectReason::ExposureLimit {
                proposed_pct: Some(pct),
                max_pct,
            } => write!(
                f,
                "portfolio exposure would be {:.2}%, limit {}%",
                pct, max_pct
            ),
            RejectReason::ExposureLimit {
                proposed_pct: None,
                max_pct,
            } => write!(f, "exposure undefined without positive equity, limit {}%", max_pct),
            RejectReason::StaleSnapshot {
                age_secs,
                max_age_secs,
            } => write!(f, "snapshot is {}s old, limit {}s", age_secs, max_age_secs),
            RejectReason::UnknownExposure { symbols } => write!(
                f,
                "exposure unknown while {} cannot be resolved",
                symbols.join(", ")
            ),
            RejectReason::TotalQuantityLimit { proposed, max } => write!(
                f,
                "total quantity would be {}, limit {}",
                proposed.normalize(),
                max.normalize()
            ),
            RejectReason::UnprofitableSell { net_pnl } => {
                write!(f, "sell nets {:.2} after fees", net_pnl)
            }
        }
    }
}

/// Result of validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorOutcome {
    /// Passed every hard limit
    Valid,
    /// Forced to HOLD; confidence kept for audit only
    Rejected { reasons: Vec<RejectReason> },
    /// Symbol could not be evaluated this cycle
    Degraded { reason: String },
}

/// Final, immutable per-symbol decision for one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub cycle_id: Uuid,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub confidence: Decimal,
    pub technical_score: Decimal,
    pub sentiment_score: Decimal,
    pub risk_score: Decimal,
    pub combined_score: Decimal,
    pub explanation: Explanation,
    pub outcome: ValidatorOutcome,
}

impl Decision {
    /// HOLD with zero confidence recording why the symbol was not evaluated
    pub fn degraded(
        cycle_id: Uuid,
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            cycle_id,
            symbol: symbol.into(),
            timestamp,
            action: Action::Hold,
            confidence: Decimal::ZERO,
            technical_score: Decimal::ZERO,
            sentiment_score: Decimal::ZERO,
            risk_score: Decimal::ZERO,
            combined_score: Decimal::ZERO,
            explanation: Explanation::note(reason.clone()),
            outcome: ValidatorOutcome::Degraded { reason },
        }
    }

    /// Whether the decision was produced by a fault rather than by signals
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, ValidatorOutcome::Degraded { .. })
    }

    /// Whether an execution collaborator should act on it
    pub fn is_actionable(&self) -> bool {
        self.outcome == ValidatorOutcome::Valid && self.action != Action::Hold
    }
}
