//! Position calculator
//!
//! Replays a symbol's trades in (timestamp, sequence) order. Buys blend into
//! the weighted-average cost; sells leave the average untouched and realize
//! `(price - avg_cost) * quantity`.

use super::{PositionError, PositionState, Realization};
use crate::ledger::{LedgerEntry, TradeLedger, TradeSide};
use chrono::{DateTime, Utc};

/// Derives positions from the trade ledger
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionCalculator;

impl PositionCalculator {
    /// Create a new calculator
    pub fn new() -> Self {
        Self
    }

    /// Position of `symbol` as of `as_of`, read from the ledger
    pub async fn position_as_of(
        &self,
        ledger: &dyn TradeLedger,
        symbol: &str,
        as_of: DateTime<Utc>,
    ) -> Result<PositionState, PositionError> {
        let entries = ledger.trades_for_symbol(symbol, as_of).await?;
        self.replay(symbol, &entries, as_of)
    }

    /// Replay ledger entries for `symbol` up to and including `as_of`
    ///
    /// Entries for other symbols or later timestamps are ignored. Input order
    /// does not matter; entries are sorted by timestamp, then sequence.
    pub fn replay(
        &self,
        symbol: &str,
        entries: &[LedgerEntry],
        as_of: DateTime<Utc>,
    ) -> Result<PositionState, PositionError> {
        let mut ordered: Vec<&LedgerEntry> = entries
            .iter()
            .filter(|e| e.trade.symbol == symbol && e.trade.timestamp <= as_of)
            .collect();
        ordered.sort_by(|a, b| {
            a.trade
                .timestamp
                .cmp(&b.trade.timestamp)
                .then(a.seq.cmp(&b.seq))
        });

        let mut state = PositionState::empty(symbol);

        for entry in ordered {
            let trade = &entry.trade;
            let overflow = || PositionError::Overflow {
                symbol: symbol.to_string(),
                timestamp: trade.timestamp,
            };
            let position = &mut state.position;

            match trade.side {
                TradeSide::Buy => {
                    let new_quantity = position
                        .quantity
                        .checked_add(trade.quantity)
                        .ok_or_else(overflow)?;
                    let held_cost = position
                        .quantity
                        .checked_mul(position.avg_cost)
                        .ok_or_else(overflow)?;
                    let bought_cost = trade
                        .quantity
                        .checked_mul(trade.price)
                        .ok_or_else(overflow)?;
                    position.avg_cost = held_cost
                        .checked_add(bought_cost)
                        .and_then(|cost| cost.checked_div(new_quantity))
                        .ok_or_else(overflow)?;
                    position.quantity = new_quantity;
                }
                TradeSide::Sell => {
                    if trade.quantity > position.quantity {
                        return Err(PositionError::InsufficientPosition {
                            symbol: symbol.to_string(),
                            held: position.quantity,
                            requested: trade.quantity,
                            timestamp: trade.timestamp,
                        });
                    }
                    let pnl = trade
                        .price
                        .checked_sub(position.avg_cost)
                        .and_then(|diff| diff.checked_mul(trade.quantity))
                        .ok_or_else(overflow)?;
                    position.quantity -= trade.quantity;
                    state.realized_pnl = state.realized_pnl.checked_add(pnl).ok_or_else(overflow)?;
                    state.realizations.push(Realization {
                        timestamp: trade.timestamp,
                        quantity: trade.quantity,
                        price: trade.price,
                        avg_cost: position.avg_cost,
                        pnl,
                        fees: trade.fees,
                    });
                }
            }

            state.fees_paid = state.fees_paid.checked_add(trade.fees).ok_or_else(overflow)?;
            state.trade_count += 1;
            state.last_trade_at = Some(trade.timestamp);
        }

        Ok(state)
    }
}
