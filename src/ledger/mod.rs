//! Trade ledger module
//!
//! Append-only record of executed trades, the source of truth for positions

mod memory;
mod types;

pub use memory::{load_trades_json, InMemoryLedger};
pub use types::{LedgerEntry, LedgerError, Trade, TradeSide};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for trade ledger implementations
#[async_trait]
pub trait TradeLedger: Send + Sync {
    /// Validate and append a trade, returning the recorded entry
    async fn append_trade(&self, trade: Trade) -> Result<LedgerEntry, LedgerError>;
    /// All trades for `symbol` with timestamp <= `up_to`, ordered by (timestamp, seq)
    async fn trades_for_symbol(
        &self,
        symbol: &str,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;
    /// Every trade with timestamp <= `up_to`, read in one pass and ordered by (timestamp, seq)
    async fn trades_up_to(&self, up_to: DateTime<Utc>) -> Result<Vec<LedgerEntry>, LedgerError>;
    /// Symbols with at least one recorded trade
    async fn symbols(&self) -> Result<Vec<String>, LedgerError>;
}
