//! Profitability report types

use crate::signal::{checked_ratio, saturating_add, saturating_mul};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Profitability errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfitabilityError {
    /// A held symbol has no usable market snapshot
    #[error("Stale or missing snapshot for held symbol {symbol}")]
    StaleSnapshot { symbol: String },
    /// Marking the symbol exceeded the decimal range
    #[error("Arithmetic overflow marking {symbol}")]
    Overflow { symbol: String },
}

/// Mark-to-market status of a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolStatus {
    /// Open position priced from a snapshot
    Marked,
    /// No quantity held; realized P&L only
    Closed,
    /// Open position that could not be priced
    Degraded { reason: String },
    /// Position could not be derived from the ledger; quantity unknown
    Unresolved { reason: String },
}

/// Per-symbol profitability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolProfitability {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
    /// Snapshot close, if one was supplied
    pub current_price: Option<Decimal>,
    /// quantity * avg_cost
    pub cost_basis: Decimal,
    /// quantity * current_price, absent when degraded
    pub market_value: Option<Decimal>,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_pct: Decimal,
    pub realized_pnl: Decimal,
    pub fees_paid: Decimal,
    pub status: SymbolStatus,
}

impl SymbolProfitability {
    /// Whether the symbol was excluded from mark-to-market totals
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.status,
            SymbolStatus::Degraded { .. } | SymbolStatus::Unresolved { .. }
        )
    }

    /// Unresolved entry for a symbol whose ledger replay failed
    pub fn unresolved(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: Decimal::ZERO,
            avg_cost: Decimal::ZERO,
            current_price: None,
            cost_basis: Decimal::ZERO,
            market_value: None,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            status: SymbolStatus::Unresolved {
                reason: reason.into(),
            },
        }
    }
}

/// Portfolio profitability as of one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityReport {
    /// Evaluation timestamp
    pub as_of: DateTime<Utc>,
    /// Per-symbol entries, ordered by symbol
    pub symbols: BTreeMap<String, SymbolProfitability>,
    /// Cost basis of marked open positions
    pub total_investment: Decimal,
    /// Market value of marked open positions
    pub total_current_value: Decimal,
    pub total_unrealized_pnl: Decimal,
    pub total_realized_pnl: Decimal,
    /// Realized plus unrealized
    pub total_pnl: Decimal,
    pub total_fees: Decimal,
    /// Total P&L less fees
    pub net_pnl: Decimal,
    /// total_pnl / total_investment * 100
    pub total_return_pct: Decimal,
    /// Set when total_investment is zero and the return is reported as 0
    pub return_undefined: bool,
    pub benchmark_return_pct: Option<Decimal>,
    /// total_return_pct - benchmark_return_pct
    pub excess_return_pct: Option<Decimal>,
    pub degraded_symbols: Vec<String>,
    /// Some held symbol could not be marked
    pub partial: bool,
}

impl ProfitabilityReport {
    /// Entry for one symbol
    pub fn get(&self, symbol: &str) -> Option<&SymbolProfitability> {
        self.symbols.get(symbol)
    }

    /// Number of marked open positions
    pub fn open_positions(&self) -> usize {
        self.symbols
            .values()
            .filter(|s| s.status == SymbolStatus::Marked)
            .count()
    }

    /// Capital plus total P&L
    pub fn equity(&self, capital: Decimal) -> Decimal {
        saturating_add(capital, self.total_pnl)
    }

    /// Value at risk across every known position
    ///
    /// Marked positions count at market value, unpriced ones at cost basis.
    pub fn exposure_value(&self) -> Decimal {
        self.symbols
            .values()
            .filter(|s| matches!(s.status, SymbolStatus::Degraded { .. }))
            .fold(self.total_current_value, |acc, s| saturating_add(acc, s.cost_basis))
    }

    /// Symbols whose quantity could not be derived
    pub fn unresolved_symbols(&self) -> Vec<String> {
        self.symbols
            .values()
            .filter(|s| matches!(s.status, SymbolStatus::Unresolved { .. }))
            .map(|s| s.symbol.clone())
            .collect()
    }

    /// Sum of quantities held across known positions
    pub fn total_quantity(&self) -> Decimal {
        self.symbols
            .values()
            .fold(Decimal::ZERO, |acc, s| saturating_add(acc, s.quantity))
    }

    /// Unrealized P&L as a percentage of marked market value
    ///
    /// `None` without a marked position.
    pub fn unrealized_pnl_pct(&self) -> Option<Decimal> {
        if self.total_current_value <= Decimal::ZERO {
            return None;
        }
        checked_ratio(self.total_unrealized_pnl, self.total_current_value)
            .map(|ratio| saturating_mul(ratio, dec!(100)))
    }

    /// Exposure as a percentage of equity
    ///
    /// `None` when equity is not positive.
    pub fn exposure_pct(&self, capital: Decimal) -> Option<Decimal> {
        let equity = self.equity(capital);
        if equity <= Decimal::ZERO {
            return None;
        }
        checked_ratio(self.exposure_value(), equity).map(|ratio| saturating_mul(ratio, dec!(100)))
    }

    /// Record a symbol whose position could not be derived
    pub fn mark_unresolved(&mut self, symbol: &str, reason: impl Into<String>) {
        self.symbols
            .insert(symbol.to_string(), SymbolProfitability::unresolved(symbol, reason));
        if !self.degraded_symbols.iter().any(|s| s == symbol) {
            self.degraded_symbols.push(symbol.to_string());
            self.degraded_symbols.sort();
        }
        self.partial = true;
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut rows = String::new();
        for s in self.symbols.values() {
            let price = s
                .current_price
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string());
            let status = match &s.status {
                SymbolStatus::Marked => "marked",
                SymbolStatus::Closed => "closed",
                SymbolStatus::Degraded { .. } => "DEGRADED",
                SymbolStatus::Unresolved { .. } => "UNRESOLVED",
            };
            rows.push_str(&format!(
                "{:<10} {:>10} {:>12.2} {:>12} {:>12.2} {:>12.2}  {}\n",
                s.symbol,
                s.quantity.normalize(),
                s.avg_cost,
                price,
                s.unrealized_pnl,
                s.realized_pnl,
                status,
            ));
        }

        let benchmark = self
            .benchmark_return_pct
            .map(|b| format!("{:+.2}%", b))
            .unwrap_or_else(|| "n/a".to_string());
        let excess = self
            .excess_return_pct
            .map(|e| format!("{:+.2}%", e))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            r#"
══════════════════════════════════════════════════════════════════════════════
               PORTFOLIO PROFITABILITY  ({})
══════════════════════════════════════════════════════════════════════════════

SYMBOL            QTY     AVG COST        PRICE   UNREALIZED     REALIZED  STATUS
──────────────────────────────────────────────────────────────────────────────
{}
TOTALS
──────────────────────────────────────────────────────────────────────────────
Investment:       {:.2}
Current Value:    {:.2}
Unrealized P&L:   {:+.2}
Realized P&L:     {:+.2}
Total P&L:        {:+.2} ({:+.2}%){}
Fees:             {:.2}
Net P&L:          {:+.2}
Benchmark:        {}
Excess Return:    {}
{}══════════════════════════════════════════════════════════════════════════════
"#,
            self.as_of.format("%Y-%m-%d %H:%M:%S UTC"),
            rows,
            self.total_investment,
            self.total_current_value,
            self.total_unrealized_pnl,
            self.total_realized_pnl,
            self.total_pnl,
            self.total_return_pct,
            if self.return_undefined { " [no open investment]" } else { "" },
            self.total_fees,
            self.net_pnl,
            benchmark,
            excess,
            if self.partial {
                format!("PARTIAL: degraded {}\n", self.degraded_symbols.join(", "))
            } else {
                String::new()
            },
        )
    }
}
