//! Market data types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Technical indicator values for one instrument
///
/// Every field is optional; a feed that did not compute an indicator leaves
/// it out and the scorer treats the dependent sub-signal as neutral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorVector {
    /// Relative strength index (0-100)
    #[serde(default)]
    pub rsi: Option<Decimal>,
    /// MACD line
    #[serde(default)]
    pub macd: Option<Decimal>,
    /// MACD signal line
    #[serde(default)]
    pub macd_signal: Option<Decimal>,
    /// 20-period simple moving average
    #[serde(default)]
    pub sma_20: Option<Decimal>,
    /// 50-period simple moving average
    #[serde(default)]
    pub sma_50: Option<Decimal>,
    /// Average true range, in price units
    #[serde(default)]
    pub atr: Option<Decimal>,
    /// Volume of the current bar
    #[serde(default)]
    pub volume: Option<Decimal>,
    /// Moving average of volume
    #[serde(default)]
    pub volume_ma: Option<Decimal>,
    /// Percentage change over the day
    #[serde(default)]
    pub daily_change_pct: Option<Decimal>,
}

/// Sentiment classification supplied by the news feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl SentimentLabel {
    /// Classify a score in [-1, 1]
    pub fn from_score(score: Decimal) -> Self {
        if score >= dec!(0.1) {
            SentimentLabel::Positive
        } else if score <= dec!(-0.1) {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

/// Scored news sentiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Score in [-1, 1]
    pub score: Decimal,
    /// Feed-supplied label
    #[serde(default)]
    pub label: SentimentLabel,
    /// Age of the underlying news, in hours
    #[serde(default)]
    pub age_hours: Decimal,
}

impl Sentiment {
    /// Fresh sentiment labelled from its score
    pub fn new(score: Decimal) -> Self {
        Self {
            score,
            label: SentimentLabel::from_score(score),
            age_hours: Decimal::ZERO,
        }
    }

    /// Set the news age
    pub fn aged(mut self, age_hours: Decimal) -> Self {
        self.age_hours = age_hours;
        self
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

/// Market view of one instrument for one evaluation cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Instrument symbol
    pub symbol: String,
    /// Snapshot timestamp
    pub timestamp: DateTime<Utc>,
    /// Close price
    pub close: Decimal,
    /// Technical indicators
    #[serde(default)]
    pub indicators: IndicatorVector,
    /// News sentiment
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Provider-reported seconds since the data was produced
    #[serde(default)]
    pub age_secs: u64,
}

impl MarketSnapshot {
    /// Snapshot with a price only
    pub fn new(symbol: impl Into<String>, close: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            close,
            indicators: IndicatorVector::default(),
            sentiment: Sentiment::default(),
            age_secs: 0,
        }
    }

    /// Attach indicators
    pub fn with_indicators(mut self, indicators: IndicatorVector) -> Self {
        self.indicators = indicators;
        self
    }

    /// Attach sentiment
    pub fn with_sentiment(mut self, sentiment: Sentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    /// Set data age
    pub fn with_age_secs(mut self, age_secs: u64) -> Self {
        self.age_secs = age_secs;
        self
    }

    /// Age at `as_of`: the older of the reported age and the time since `timestamp`
    pub fn age_at(&self, as_of: DateTime<Utc>) -> u64 {
        let elapsed = u64::try_from((as_of - self.timestamp).num_seconds()).unwrap_or(0);
        self.age_secs.max(elapsed)
    }
}

/// Market data errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarketDataError {
    /// No snapshot available for the symbol
    #[error("No market data available for {0}")]
    NotAvailable(String),
    /// Fetch did not complete within the deadline
    #[error("Market data fetch for {symbol} timed out after {timeout_ms}ms")]
    Timeout { symbol: String, timeout_ms: u64 },
    /// Benchmark return could not be produced
    #[error("Benchmark unavailable: {0}")]
    BenchmarkUnavailable(String),
}
