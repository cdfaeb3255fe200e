//! In-memory append-only ledger

use super::{LedgerEntry, LedgerError, Trade, TradeLedger};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    next_seq: u64,
}

impl LedgerState {
    fn push(&mut self, trade: Trade) -> LedgerEntry {
        let entry = LedgerEntry {
            seq: self.next_seq,
            trade,
        };
        self.next_seq += 1;
        self.entries.push(entry.clone());
        entry
    }

    fn ordered(&self, keep: impl Fn(&LedgerEntry) -> bool) -> Vec<LedgerEntry> {
        let mut trades: Vec<LedgerEntry> = self.entries.iter().filter(|e| keep(e)).cloned().collect();
        trades.sort_by(|a, b| {
            a.trade
                .timestamp
                .cmp(&b.trade.timestamp)
                .then(a.seq.cmp(&b.seq))
        });
        trades
    }
}

/// Ledger backed by a lock-guarded vector
///
/// Appends take the write lock, so readers always observe either the
/// state before or after a complete append.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load trades in the given order, validating each one
    pub fn from_trades(trades: impl IntoIterator<Item = Trade>) -> Result<Self, LedgerError> {
        let mut state = LedgerState::default();
        for trade in trades {
            trade.validate()?;
            state.push(trade);
        }
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Number of recorded trades
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the ledger holds no trades
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[async_trait]
impl TradeLedger for InMemoryLedger {
    async fn append_trade(&self, trade: Trade) -> Result<LedgerEntry, LedgerError> {
        trade.validate()?;
        let mut state = self.state.write().await;
        let entry = state.push(trade);
        tracing::debug!(
            seq = entry.seq,
            symbol = %entry.trade.symbol,
            side = ?entry.trade.side,
            "Trade appended"
        );
        Ok(entry)
    }

    async fn trades_for_symbol(
        &self,
        symbol: &str,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.ordered(|e| e.trade.symbol == symbol && e.trade.timestamp <= up_to))
    }

    async fn trades_up_to(&self, up_to: DateTime<Utc>) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.ordered(|e| e.trade.timestamp <= up_to))
    }

    async fn symbols(&self) -> Result<Vec<String>, LedgerError> {
        let state = self.state.read().await;
        let symbols: BTreeSet<&str> = state
            .entries
            .iter()
            .map(|e| e.trade.symbol.as_str())
            .collect();
        Ok(symbols.into_iter().map(String::from).collect())
    }
}

/// Load a JSON array of trades from disk
pub fn load_trades_json(path: impl AsRef<Path>) -> Result<Vec<Trade>, LedgerError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| LedgerError::Storage(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| LedgerError::Storage(format!("{}: {}", path.display(), e)))
}
