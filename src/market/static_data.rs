//! File- and memory-backed market data

use super::{BenchmarkProvider, MarketDataError, MarketSnapshot, MarketSnapshotProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// On-disk layout of a market data file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketFile {
    /// Benchmark return in percent, if known
    #[serde(default)]
    pub benchmark_return_pct: Option<Decimal>,
    /// One snapshot per symbol
    #[serde(default)]
    pub snapshots: Vec<MarketSnapshot>,
}

/// Market data held in memory, replaceable between cycles
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    snapshots: Arc<RwLock<HashMap<String, MarketSnapshot>>>,
    benchmark_return_pct: Arc<RwLock<Option<Decimal>>>,
}

impl StaticMarketData {
    /// Create an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a parsed market file
    pub fn from_file(file: MarketFile) -> Self {
        let snapshots = file
            .snapshots
            .into_iter()
            .map(|s| (s.symbol.clone(), s))
            .collect();
        Self {
            snapshots: Arc::new(RwLock::new(snapshots)),
            benchmark_return_pct: Arc::new(RwLock::new(file.benchmark_return_pct)),
        }
    }

    /// Load a JSON market file from disk
    pub fn load_json(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: MarketFile = serde_json::from_str(&content)?;
        Ok(Self::from_file(file))
    }

    /// Insert or replace a snapshot
    pub async fn set_snapshot(&self, snapshot: MarketSnapshot) {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.symbol.clone(), snapshot);
    }

    /// Drop a symbol's snapshot
    pub async fn remove_snapshot(&self, symbol: &str) {
        self.snapshots.write().await.remove(symbol);
    }

    /// Set the benchmark return
    pub async fn set_benchmark_return(&self, pct: Option<Decimal>) {
        *self.benchmark_return_pct.write().await = pct;
    }
}

#[async_trait]
impl MarketSnapshotProvider for StaticMarketData {
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, MarketDataError> {
        self.snapshots
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::NotAvailable(symbol.to_string()))
    }
}

#[async_trait]
impl BenchmarkProvider for StaticMarketData {
    async fn benchmark_return(
        &self,
        _period_start: DateTime<Utc>,
        _period_end: DateTime<Utc>,
    ) -> Result<Decimal, MarketDataError> {
        self.benchmark_return_pct
            .read()
            .await
            .ok_or_else(|| MarketDataError::BenchmarkUnavailable("not configured".to_string()))
    }
}
