//! Signal types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Technical sub-signal families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubSignalKind {
    /// RSI and MACD
    Momentum,
    /// Short vs long moving average
    Trend,
    /// ATR relative to price
    Volatility,
    /// Volume surge in the direction of the day's move
    Volume,
}

impl fmt::Display for SubSignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubSignalKind::Momentum => "momentum",
            SubSignalKind::Trend => "trend",
            SubSignalKind::Volatility => "volatility",
            SubSignalKind::Volume => "volume",
        };
        f.write_str(name)
    }
}

/// One weighted technical sub-signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSignal {
    pub kind: SubSignalKind,
    /// Unclamped value, `None` when the inputs were missing
    pub raw: Option<Decimal>,
    /// Value clamped to [-1, 1]; zero when missing
    pub value: Decimal,
    pub weight: Decimal,
    /// weight * value
    pub contribution: Decimal,
}

/// Scorer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalScores {
    /// Weighted technical score in [-1, 1]
    pub technical: Decimal,
    /// Recency-decayed sentiment in [-1, 1]
    pub sentiment: Decimal,
    /// Technical breakdown in (momentum, trend, volatility, volume) order
    pub sub_signals: Vec<SubSignal>,
}

impl SignalScores {
    /// Sub-signals whose inputs were missing
    pub fn missing(&self) -> impl Iterator<Item = SubSignalKind> + '_ {
        self.sub_signals
            .iter()
            .filter(|s| s.raw.is_none())
            .map(|s| s.kind)
    }
}

/// Rule that set the risk score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RiskTrigger {
    /// Unrealized loss breached the stop-loss
    StopLoss { unrealized_pct: Decimal },
    /// Unrealized gain reached the take-profit
    TakeProfit { unrealized_pct: Decimal },
    /// Headroom below the single-position cap
    Concentration { weight_pct: Decimal },
    /// Equity is not positive
    NoEquity,
}

impl fmt::Display for RiskTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTrigger::StopLoss { unrealized_pct } => {
                write!(f, "stop-loss hit at {:.2}% unrealized", unrealized_pct)
            }
            RiskTrigger::TakeProfit { unrealized_pct } => {
                write!(f, "take-profit hit at {:.2}% unrealized", unrealized_pct)
            }
            RiskTrigger::Concentration { weight_pct } => {
                write!(f, "position is {:.2}% of equity", weight_pct)
            }
            RiskTrigger::NoEquity => f.write_str("no positive equity"),
        }
    }
}

/// Risk scorer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Score in [-1, 1]; negative favours reducing exposure
    pub score: Decimal,
    pub trigger: RiskTrigger,
}
