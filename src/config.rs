//! Configuration types for basket-trader

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Tolerance used when checking that a weight group sums to one
const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.000001);

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Could not read config: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid TOML for this schema
    #[error("Could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A weight group does not sum to one or holds a negative weight
    #[error("Invalid weight config for {group}: weights sum to {sum}, expected 1.0")]
    InvalidWeightConfig { group: &'static str, sum: Decimal },
    /// A scalar option is outside its allowed range
    #[error("Config field {field} out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub universe: UniverseConfig,
    pub scoring: ScoringConfig,
    pub fusion: FusionConfig,
    pub risk: RiskConfig,
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Instrument universe and capital base
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UniverseConfig {
    /// Fixed basket of instruments evaluated each cycle
    pub symbols: Vec<String>,
    /// Starting capital, the denominator for position and exposure limits
    pub capital: Decimal,
}

/// Technical scoring weights and sentiment decay
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    pub momentum_weight: Decimal,
    pub trend_weight: Decimal,
    pub volatility_weight: Decimal,
    pub volume_weight: Decimal,
    /// Sentiment older than this contributes nothing
    #[serde(default = "default_sentiment_max_age_hours")]
    pub sentiment_max_age_hours: Decimal,
}

/// Decision fusion weights and thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FusionConfig {
    pub technical_weight: Decimal,
    pub sentiment_weight: Decimal,
    pub risk_weight: Decimal,
    /// Combined score at or above which the action is BUY
    #[serde(default = "default_theta")]
    pub theta_buy: Decimal,
    /// Combined score at or below the negation of which the action is SELL
    #[serde(default = "default_theta")]
    pub theta_sell: Decimal,
    /// Confidence multiplier bonus when technical and sentiment agree
    #[serde(default = "default_agreement_boost")]
    pub agreement_boost: Decimal,
    /// BUY on a position at or above this quantity is downgraded to HOLD
    pub max_position_quantity: Decimal,
}

/// Hard risk limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RiskConfig {
    /// Largest single position, percent of equity
    pub max_position_pct: Decimal,
    /// Largest aggregate exposure, percent of equity
    pub max_exposure_pct: Decimal,
    /// Snapshots older than this are rejected
    pub max_snapshot_age_seconds: u64,
    /// Quantity a BUY or SELL decision proposes to trade
    pub trade_quantity: Decimal,
    /// Unrealized loss percentage that turns the risk score fully negative
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Unrealized gain percentage that turns the risk score fully negative
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    /// Portfolio unrealized loss percentage that forces an exit from every position
    #[serde(default = "default_portfolio_stop_loss_pct")]
    pub portfolio_stop_loss_pct: Decimal,
    /// Cap on the summed quantity held across the universe
    #[serde(default)]
    pub max_total_quantity: Option<Decimal>,
    /// Fee per trade as a fraction of notional; enables the fee-aware SELL check
    #[serde(default)]
    pub fee_rate: Option<Decimal>,
}

/// Cycle scheduling
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    pub cycle_interval_seconds: u64,
    /// Upper bound on concurrent snapshot fetches
    pub max_concurrency: usize,
    /// Per-symbol snapshot fetch deadline
    #[serde(default = "default_snapshot_timeout_ms")]
    pub snapshot_timeout_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

fn default_sentiment_max_age_hours() -> Decimal {
    dec!(24)
}
fn default_theta() -> Decimal {
    dec!(0.3)
}
fn default_agreement_boost() -> Decimal {
    dec!(0.25)
}
fn default_stop_loss_pct() -> Decimal {
    dec!(-3)
}
fn default_take_profit_pct() -> Decimal {
    dec!(5)
}
fn default_portfolio_stop_loss_pct() -> Decimal {
    dec!(-10)
}
fn default_snapshot_timeout_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

/// Check that a weight group is non-negative and sums to one
pub fn check_weights(group: &'static str, weights: &[Decimal]) -> Result<(), ConfigError> {
    let sum: Decimal = weights.iter().copied().sum();
    if weights.iter().any(|w| *w < Decimal::ZERO)
        || (sum - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE
    {
        return Err(ConfigError::InvalidWeightConfig { group, sum });
    }
    Ok(())
}

fn out_of_range(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        reason: reason.into(),
    }
}

fn check_pct(field: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO || value > dec!(100) {
        return Err(out_of_range(field, format!("{} not in (0, 100]", value)));
    }
    Ok(())
}

impl ScoringConfig {
    /// Weights in (momentum, trend, volatility, volume) order
    pub fn weights(&self) -> [Decimal; 4] {
        [
            self.momentum_weight,
            self.trend_weight,
            self.volatility_weight,
            self.volume_weight,
        ]
    }
}

impl FusionConfig {
    /// Weights in (technical, sentiment, risk) order
    pub fn weights(&self) -> [Decimal; 3] {
        [self.technical_weight, self.sentiment_weight, self.risk_weight]
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.symbols.is_empty() {
            return Err(out_of_range("universe.symbols", "must not be empty"));
        }
        let mut seen = HashSet::new();
        for symbol in &self.universe.symbols {
            if symbol.trim().is_empty() || !seen.insert(symbol.as_str()) {
                return Err(out_of_range(
                    "universe.symbols",
                    format!("empty or duplicate symbol {:?}", symbol),
                ));
            }
        }
        if self.universe.capital <= Decimal::ZERO {
            return Err(out_of_range("universe.capital", "must be positive"));
        }

        check_weights("scoring", &self.scoring.weights())?;
        if self.scoring.sentiment_max_age_hours <= Decimal::ZERO {
            return Err(out_of_range(
                "scoring.sentiment_max_age_hours",
                "must be positive",
            ));
        }

        check_weights("fusion", &self.fusion.weights())?;
        for (field, theta) in [
            ("fusion.theta_buy", self.fusion.theta_buy),
            ("fusion.theta_sell", self.fusion.theta_sell),
        ] {
            if theta <= Decimal::ZERO || theta > Decimal::ONE {
                return Err(out_of_range(field, format!("{} not in (0, 1]", theta)));
            }
        }
        if self.fusion.agreement_boost < Decimal::ZERO {
            return Err(out_of_range("fusion.agreement_boost", "must not be negative"));
        }
        if self.fusion.max_position_quantity <= Decimal::ZERO {
            return Err(out_of_range(
                "fusion.max_position_quantity",
                "must be positive",
            ));
        }

        check_pct("risk.max_position_pct", self.risk.max_position_pct)?;
        check_pct("risk.max_exposure_pct", self.risk.max_exposure_pct)?;
        if self.risk.trade_quantity <= Decimal::ZERO {
            return Err(out_of_range("risk.trade_quantity", "must be positive"));
        }
        if self.risk.stop_loss_pct >= Decimal::ZERO {
            return Err(out_of_range("risk.stop_loss_pct", "must be negative"));
        }
        if self.risk.take_profit_pct <= Decimal::ZERO {
            return Err(out_of_range("risk.take_profit_pct", "must be positive"));
        }
        if self.risk.portfolio_stop_loss_pct >= Decimal::ZERO {
            return Err(out_of_range("risk.portfolio_stop_loss_pct", "must be negative"));
        }
        if self.risk.max_total_quantity.is_some_and(|q| q <= Decimal::ZERO) {
            return Err(out_of_range("risk.max_total_quantity", "must be positive"));
        }
        if let Some(rate) = self.risk.fee_rate {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(out_of_range("risk.fee_rate", format!("{} not in [0, 1)", rate)));
            }
        }

        if self.orchestrator.cycle_interval_seconds == 0 {
            return Err(out_of_range(
                "orchestrator.cycle_interval_seconds",
                "must be positive",
            ));
        }
        if self.orchestrator.max_concurrency == 0 {
            return Err(out_of_range(
                "orchestrator.max_concurrency",
                "must be at least 1",
            ));
        }
        if self.orchestrator.snapshot_timeout_ms == 0 {
            return Err(out_of_range(
                "orchestrator.snapshot_timeout_ms",
                "must be positive",
            ));
        }

        Ok(())
    }
}
