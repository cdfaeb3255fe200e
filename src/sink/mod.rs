//! Decision sinks
//!
//! Collaborators that receive every emitted decision. A sink sees each
//! decision exactly once, by shared reference, after its cycle completed.

mod jsonl;
mod memory;

pub use jsonl::JsonlDecisionSink;
pub use memory::MemoryDecisionSink;

use crate::decision::Decision;
use async_trait::async_trait;
use thiserror::Error;

/// Sink delivery errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receiver of final decisions
#[async_trait]
pub trait DecisionSink: Send + Sync {
    /// Called once per symbol per completed cycle
    async fn on_decision(&self, decision: &Decision) -> Result<(), SinkError>;
}

/// Logs each decision through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDecisionSink;

#[async_trait]
impl DecisionSink for LoggingDecisionSink {
    async fn on_decision(&self, decision: &Decision) -> Result<(), SinkError> {
        if decision.is_degraded() {
            tracing::warn!(
                cycle_id = %decision.cycle_id,
                symbol = %decision.symbol,
                reason = ?decision.explanation.notes,
                "Degraded decision"
            );
        } else {
            tracing::info!(
                cycle_id = %decision.cycle_id,
                symbol = %decision.symbol,
                action = %decision.action,
                confidence = %decision.confidence.round_dp(3),
                combined = %decision.combined_score.round_dp(3),
                actionable = decision.is_actionable(),
                "Decision"
            );
        }
        Ok(())
    }
}
