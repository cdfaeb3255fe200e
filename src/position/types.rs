//! Position types

use crate::ledger::LedgerError;
use crate::signal::{saturating_mul, saturating_sub};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Net holding of an instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument symbol
    pub symbol: String,
    /// Net quantity held, never negative
    pub quantity: Decimal,
    /// Weighted-average cost basis
    pub avg_cost: Decimal,
}

impl Position {
    /// A flat position
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            avg_cost: Decimal::ZERO,
        }
    }

    /// Whether any quantity is held
    pub fn is_open(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    /// Capital committed at average cost
    pub fn cost_basis(&self) -> Decimal {
        saturating_mul(self.quantity, self.avg_cost)
    }
}

/// Gain or loss locked in by one sell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realization {
    /// Sell timestamp
    pub timestamp: DateTime<Utc>,
    /// Quantity sold
    pub quantity: Decimal,
    /// Sell price
    pub price: Decimal,
    /// Average cost at the time of the sale
    pub avg_cost: Decimal,
    /// (price - avg_cost) * quantity
    pub pnl: Decimal,
    /// Fees paid on the sell
    pub fees: Decimal,
}

impl Realization {
    /// Realized P&L after the sell's own fees
    pub fn net_pnl(&self) -> Decimal {
        saturating_sub(self.pnl, self.fees)
    }
}

/// Position plus everything accumulated while replaying the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    /// Current position
    pub position: Position,
    /// Realized P&L to date
    pub realized_pnl: Decimal,
    /// Fees paid across all trades
    pub fees_paid: Decimal,
    /// One entry per sell, in processing order
    pub realizations: Vec<Realization>,
    /// Number of trades replayed
    pub trade_count: usize,
    /// Timestamp of the last trade replayed
    pub last_trade_at: Option<DateTime<Utc>>,
}

impl PositionState {
    /// State before any trade
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            position: Position::flat(symbol),
            realized_pnl: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            realizations: vec![],
            trade_count: 0,
            last_trade_at: None,
        }
    }

    /// Symbol of the position
    pub fn symbol(&self) -> &str {
        &self.position.symbol
    }

    /// Realized P&L less all fees paid
    pub fn net_realized_pnl(&self) -> Decimal {
        saturating_sub(self.realized_pnl, self.fees_paid)
    }
}

/// Position derivation errors
#[derive(Debug, Error)]
pub enum PositionError {
    /// A sell exceeds the quantity held at that point in the ledger
    #[error("Insufficient position in {symbol} at {timestamp}: held {held}, sell {requested}")]
    InsufficientPosition {
        symbol: String,
        held: Decimal,
        requested: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Replaying the trades exceeded the decimal range
    #[error("Arithmetic overflow replaying {symbol} at {timestamp}")]
    Overflow {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    /// Trades could not be read from the ledger
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
