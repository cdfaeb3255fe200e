//! Profitability module
//!
//! Marks ledger-derived positions to market and aggregates portfolio P&L.
//! Reports are rebuilt from scratch every cycle; nothing is carried over.

mod engine;
mod performance;
mod types;

pub use engine::compute_portfolio_report;
pub use performance::PerformanceSummary;
pub use types::{ProfitabilityError, ProfitabilityReport, SymbolProfitability, SymbolStatus};
