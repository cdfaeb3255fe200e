//! Cycle orchestrator
//!
//! Drives one evaluation pass over the universe per tick: read the ledger,
//! fetch snapshots, build the portfolio report once, then score, fuse and
//! validate every symbol before handing all decisions to the sinks.

mod cycle;
mod types;

pub use cycle::CycleOrchestrator;
pub use types::{CycleError, CycleSummary, RunOutcome};
