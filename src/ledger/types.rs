//! Ledger types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// An executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Instrument symbol (e.g., "BTCUSD")
    pub symbol: String,
    /// Trade direction
    pub side: TradeSide,
    /// Executed quantity, always positive
    pub quantity: Decimal,
    /// Execution price, always positive
    pub price: Decimal,
    /// Fees paid
    #[serde(default)]
    pub fees: Decimal,
    /// Execution timestamp
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Create a buy trade with no fees
    pub fn buy(
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: TradeSide::Buy,
            quantity,
            price,
            fees: Decimal::ZERO,
            timestamp,
        }
    }

    /// Create a sell trade with no fees
    pub fn sell(
        symbol: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            side: TradeSide::Sell,
            ..Self::buy(symbol, quantity, price, timestamp)
        }
    }

    /// Attach fees to the trade
    pub fn with_fees(mut self, fees: Decimal) -> Self {
        self.fees = fees;
        self
    }

    /// Quantity signed by side (buys positive, sells negative)
    pub fn signed_quantity(&self) -> Decimal {
        match self.side {
            TradeSide::Buy => self.quantity,
            TradeSide::Sell => -self.quantity,
        }
    }

    /// Reject malformed trades before they reach the ledger
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.symbol.trim().is_empty() {
            return Err(LedgerError::InvalidTrade("empty symbol".to_string()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidTrade(format!(
                "{}: quantity must be positive, got {}",
                self.symbol, self.quantity
            )));
        }
        if self.price <= Decimal::ZERO {
            return Err(LedgerError::InvalidTrade(format!(
                "{}: price must be positive, got {}",
                self.symbol, self.price
            )));
        }
        if self.fees < Decimal::ZERO {
            return Err(LedgerError::InvalidTrade(format!(
                "{}: fees must not be negative, got {}",
                self.symbol, self.fees
            )));
        }
        Ok(())
    }
}

/// A trade as recorded by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Insertion sequence, breaks timestamp ties
    pub seq: u64,
    /// Recorded trade
    pub trade: Trade,
}

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Trade failed validation at ingestion
    #[error("Invalid trade: {0}")]
    InvalidTrade(String),
    /// Backing store could not be read or written
    #[error("Ledger storage error: {0}")]
    Storage(String),
}
