//! Technical and sentiment scoring

use super::{
    checked_ratio, clamp_unit, saturating_mul, saturating_sub, SignalScores, SubSignal,
    SubSignalKind,
};
use crate::config::{check_weights, ConfigError, ScoringConfig};
use crate::market::{IndicatorVector, MarketSnapshot, Sentiment};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Technical sub-signal weights, validated to sum to one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    momentum: Decimal,
    trend: Decimal,
    volatility: Decimal,
    volume: Decimal,
}

impl ScoringWeights {
    /// Validate and build a weight set
    pub fn new(
        momentum: Decimal,
        trend: Decimal,
        volatility: Decimal,
        volume: Decimal,
    ) -> Result<Self, ConfigError> {
        check_weights("scoring", &[momentum, trend, volatility, volume])?;
        Ok(Self {
            momentum,
            trend,
            volatility,
            volume,
        })
    }

    /// Weight of one sub-signal family
    pub fn weight(&self, kind: SubSignalKind) -> Decimal {
        match kind {
            SubSignalKind::Momentum => self.momentum,
            SubSignalKind::Trend => self.trend,
            SubSignalKind::Volatility => self.volatility,
            SubSignalKind::Volume => self.volume,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            momentum: dec!(0.3),
            trend: dec!(0.3),
            volatility: dec!(0.2),
            volume: dec!(0.2),
        }
    }
}

/// Combines indicators and sentiment into [-1, 1] scores
#[derive(Debug, Clone)]
pub struct SignalScorer {
    weights: ScoringWeights,
    sentiment_max_age_hours: Decimal,
}

impl SignalScorer {
    /// Create a scorer
    pub fn new(weights: ScoringWeights, sentiment_max_age_hours: Decimal) -> Self {
        Self {
            weights,
            sentiment_max_age_hours,
        }
    }

    /// Create a scorer from the `[scoring]` section
    pub fn from_config(config: &ScoringConfig) -> Result<Self, ConfigError> {
        let weights = ScoringWeights::new(
            config.momentum_weight,
            config.trend_weight,
            config.volatility_weight,
            config.volume_weight,
        )?;
        Ok(Self::new(weights, config.sentiment_max_age_hours))
    }

    /// Score a market snapshot
    pub fn score_snapshot(&self, snapshot: &MarketSnapshot) -> SignalScores {
        self.score(&snapshot.indicators, snapshot.close, &snapshot.sentiment)
    }

    /// Score indicators and sentiment
    pub fn score(
        &self,
        indicators: &IndicatorVector,
        close: Decimal,
        sentiment: &Sentiment,
    ) -> SignalScores {
        let raws = [
            (SubSignalKind::Momentum, momentum(indicators)),
            (SubSignalKind::Trend, trend(indicators)),
            (SubSignalKind::Volatility, volatility(indicators, close)),
            (SubSignalKind::Volume, volume(indicators)),
        ];

        let sub_signals: Vec<SubSignal> = raws
            .into_iter()
            .map(|(kind, raw)| {
                let value = raw.map(clamp_unit).unwrap_or(Decimal::ZERO);
                let weight = self.weights.weight(kind);
                SubSignal {
                    kind,
                    raw,
                    value,
                    weight,
                    contribution: weight * value,
                }
            })
            .collect();

        let technical = clamp_unit(sub_signals.iter().map(|s| s.contribution).sum());

        SignalScores {
            technical,
            sentiment: self.decay_sentiment(sentiment),
            sub_signals,
        }
    }

    /// Sentiment scaled by `max(0, 1 - age / max_age)`
    pub fn decay_sentiment(&self, sentiment: &Sentiment) -> Decimal {
        let age = sentiment.age_hours.max(Decimal::ZERO);
        let factor = checked_ratio(age, self.sentiment_max_age_hours)
            .map(|r| saturating_sub(Decimal::ONE, r).max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO);
        clamp_unit(sentiment.score) * factor
    }
}

/// Mean of the RSI and MACD parts that are available
fn momentum(ind: &IndicatorVector) -> Option<Decimal> {
    let mut parts = Vec::with_capacity(2);

    if let Some(rsi) = ind.rsi {
        // Oversold (< 30) reads bullish, overbought (> 70) bearish
        if let Some(part) = checked_ratio(saturating_sub(dec!(50), rsi), dec!(20)) {
            parts.push(clamp_unit(part));
        }
    }

    if let (Some(macd), Some(signal), Some(atr)) = (ind.macd, ind.macd_signal, ind.atr) {
        if atr > Decimal::ZERO {
            if let Some(part) = checked_ratio(saturating_sub(macd, signal), atr) {
                parts.push(clamp_unit(part));
            }
        }
    }

    if parts.is_empty() {
        return None;
    }
    let count = Decimal::from(parts.len());
    Some(parts.into_iter().sum::<Decimal>() / count)
}

/// SMA20 vs SMA50 spread; a 5% spread saturates
fn trend(ind: &IndicatorVector) -> Option<Decimal> {
    let (sma_20, sma_50) = (ind.sma_20?, ind.sma_50?);
    if sma_50 <= Decimal::ZERO {
        return None;
    }
    let spread = checked_ratio(saturating_sub(sma_20, sma_50), sma_50)?;
    Some(saturating_mul(spread, dec!(20)))
}

/// Calm markets score positive; ATR above 4% of price is fully negative
fn volatility(ind: &IndicatorVector, close: Decimal) -> Option<Decimal> {
    let atr = ind.atr?;
    if close <= Decimal::ZERO || atr < Decimal::ZERO {
        return None;
    }
    let atr_pct = saturating_mul(checked_ratio(atr, close)?, dec!(100));
    checked_ratio(saturating_sub(dec!(2), atr_pct), dec!(2))
}

/// Relative volume signed by the day's direction
fn volume(ind: &IndicatorVector) -> Option<Decimal> {
    let (volume, volume_ma, change) = (ind.volume?, ind.volume_ma?, ind.daily_change_pct?);
    if volume_ma <= Decimal::ZERO || volume < Decimal::ZERO {
        return None;
    }
    let surge = saturating_sub(checked_ratio(volume, volume_ma)?, Decimal::ONE);
    let direction = if change > Decimal::ZERO {
        Decimal::ONE
    } else if change < Decimal::ZERO {
        -Decimal::ONE
    } else {
        Decimal::ZERO
    };
    Some(saturating_mul(surge, direction))
}
