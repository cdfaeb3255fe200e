//! In-memory decision history

use super::{DecisionSink, SinkError};
use crate::decision::Decision;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Append-only decision history, readable between cycles
#[derive(Debug, Clone, Default)]
pub struct MemoryDecisionSink {
    decisions: Arc<RwLock<Vec<Decision>>>,
}

impl MemoryDecisionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every decision received, in emission order
    pub async fn decisions(&self) -> Vec<Decision> {
        self.decisions.read().await.clone()
    }

    /// Decisions for one symbol, oldest first
    pub async fn history_for(&self, symbol: &str) -> Vec<Decision> {
        self.decisions
            .read()
            .await
            .iter()
            .filter(|d| d.symbol == symbol)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.decisions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.decisions.read().await.is_empty()
    }
}

#[async_trait]
impl DecisionSink for MemoryDecisionSink {
    async fn on_decision(&self, decision: &Decision) -> Result<(), SinkError> {
        self.decisions.write().await.push(decision.clone());
        Ok(())
    }
}
