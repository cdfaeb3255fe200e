//! Market data module
//!
//! Snapshot and benchmark collaborators consumed once per evaluation cycle

mod static_data;
mod types;

pub use static_data::{MarketFile, StaticMarketData};
pub use types::{IndicatorVector, MarketDataError, MarketSnapshot, Sentiment, SentimentLabel};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Supplies the current market view of one instrument
#[async_trait]
pub trait MarketSnapshotProvider: Send + Sync {
    /// Latest snapshot for `symbol`, or `NotAvailable`
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, MarketDataError>;
}

/// Supplies benchmark performance for excess-return reporting
#[async_trait]
pub trait BenchmarkProvider: Send + Sync {
    /// Benchmark return in percent over the period
    async fn benchmark_return(
        &self,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Decimal, MarketDataError>;
}
