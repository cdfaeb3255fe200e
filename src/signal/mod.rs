//! Signal scoring module
//!
//! Normalizes technical indicators, news sentiment and portfolio risk into
//! comparable sub-scores in [-1, 1]

mod risk;
mod scorer;
mod types;

pub use risk::RiskScorer;
pub use scorer::{ScoringWeights, SignalScorer};
pub use types::{RiskAssessment, RiskTrigger, SignalScores, SubSignal, SubSignalKind};

use rust_decimal::Decimal;

/// Clamp a score into [-1, 1]
pub fn clamp_unit(value: Decimal) -> Decimal {
    value.clamp(-Decimal::ONE, Decimal::ONE)
}

fn saturate(negative: bool) -> Decimal {
    if negative {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// Multiply without panicking on overflow
pub(crate) fn saturating_mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b)
        .unwrap_or_else(|| saturate(a.is_sign_negative() != b.is_sign_negative()))
}

/// Add without panicking on overflow
pub(crate) fn saturating_add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or_else(|| saturate(a.is_sign_negative()))
}

/// Subtract without panicking on overflow
pub(crate) fn saturating_sub(a: Decimal, b: Decimal) -> Decimal {
    a.checked_sub(b).unwrap_or_else(|| saturate(a < b))
}

/// Divide, `None` for a zero denominator
pub(crate) fn checked_ratio(num: Decimal, den: Decimal) -> Option<Decimal> {
    if den.is_zero() {
        return None;
    }
    Some(
        num.checked_div(den)
            .unwrap_or_else(|| saturate(num.is_sign_negative() != den.is_sign_negative())),
    )
}
