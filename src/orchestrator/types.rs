//! Orchestrator types

use crate::decision::{Action, Decision};
use crate::ledger::LedgerError;
use crate::profitability::{PerformanceSummary, ProfitabilityReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Reasons a cycle produced no decisions
#[derive(Debug, Error)]
pub enum CycleError {
    /// Another cycle is still in flight
    #[error("A cycle is already running")]
    AlreadyRunning,

    /// The ledger could not be read; the cycle was abandoned
    #[error("Cycle abandoned: {0}")]
    Ledger(#[from] LedgerError),

    /// The orchestrator was stopped
    #[error("Orchestrator stopped")]
    Stopped,
}

/// Everything one completed cycle produced
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One decision per universe symbol, in universe order
    pub decisions: Vec<Decision>,
    pub report: ProfitabilityReport,
    pub performance: PerformanceSummary,
}

impl CycleSummary {
    /// Decision for one symbol
    pub fn decision(&self, symbol: &str) -> Option<&Decision> {
        self.decisions.iter().find(|d| d.symbol == symbol)
    }

    /// Number of decisions emitted because of a fault
    pub fn degraded_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_degraded()).count()
    }

    /// Number of decisions with the given action
    pub fn count(&self, action: Action) -> usize {
        self.decisions.iter().filter(|d| d.action == action).count()
    }
}

/// Result of a run loop
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub cycles_completed: usize,
    /// Cycles refused or abandoned
    pub cycles_failed: usize,
    pub last_summary: Option<CycleSummary>,
}
